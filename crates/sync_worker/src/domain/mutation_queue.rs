use common::{DomainError, DomainResult, FieldSet, RecordUpdate, TableRecord, TableStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

enum MutationOp {
    Create { table_id: String, fields: FieldSet },
    Update { table_id: String, record_id: String, fields: FieldSet },
    BatchCreate { table_id: String, records: Vec<FieldSet> },
    BatchUpdate { table_id: String, updates: Vec<RecordUpdate> },
}

enum MutationOutput {
    Record(TableRecord),
    Records(Vec<TableRecord>),
}

struct QueuedTask {
    op: MutationOp,
    reply: oneshot::Sender<DomainResult<MutationOutput>>,
}

/// Single FIFO lane in front of the store's mutating operations.
///
/// One drainer task executes queued mutations in submission order, spacing
/// task starts at least `min_delay` apart (measured from the start of the
/// previous task). Each submitter awaits its own result; a failed mutation
/// is reported only to its submitter and the lane keeps draining.
pub struct MutationQueue {
    tx: mpsc::UnboundedSender<QueuedTask>,
}

impl MutationQueue {
    pub fn start(store: Arc<dyn TableStore>, min_delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(store, rx, min_delay));
        Self { tx }
    }

    pub async fn create_record(
        &self,
        table_id: &str,
        fields: FieldSet,
    ) -> DomainResult<TableRecord> {
        let op = MutationOp::Create { table_id: table_id.to_string(), fields };
        match self.submit(op).await? {
            MutationOutput::Record(record) => Ok(record),
            MutationOutput::Records(_) => Err(DomainError::QueueClosed),
        }
    }

    pub async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: FieldSet,
    ) -> DomainResult<TableRecord> {
        let op = MutationOp::Update {
            table_id: table_id.to_string(),
            record_id: record_id.to_string(),
            fields,
        };
        match self.submit(op).await? {
            MutationOutput::Record(record) => Ok(record),
            MutationOutput::Records(_) => Err(DomainError::QueueClosed),
        }
    }

    pub async fn batch_create_records(
        &self,
        table_id: &str,
        records: Vec<FieldSet>,
    ) -> DomainResult<Vec<TableRecord>> {
        let op = MutationOp::BatchCreate { table_id: table_id.to_string(), records };
        match self.submit(op).await? {
            MutationOutput::Records(records) => Ok(records),
            MutationOutput::Record(_) => Err(DomainError::QueueClosed),
        }
    }

    pub async fn batch_update_records(
        &self,
        table_id: &str,
        updates: Vec<RecordUpdate>,
    ) -> DomainResult<Vec<TableRecord>> {
        let op = MutationOp::BatchUpdate { table_id: table_id.to_string(), updates };
        match self.submit(op).await? {
            MutationOutput::Records(records) => Ok(records),
            MutationOutput::Record(_) => Err(DomainError::QueueClosed),
        }
    }

    async fn submit(&self, op: MutationOp) -> DomainResult<MutationOutput> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueuedTask { op, reply })
            .map_err(|_| DomainError::QueueClosed)?;
        rx.await.map_err(|_| DomainError::QueueClosed)?
    }
}

async fn drain(
    store: Arc<dyn TableStore>,
    mut rx: mpsc::UnboundedReceiver<QueuedTask>,
    min_delay: Duration,
) {
    while let Some(task) = rx.recv().await {
        let started = Instant::now();
        let result = execute(store.as_ref(), task.op).await;
        if let Err(error) = &result {
            warn!(%error, "queued mutation failed");
        }
        // Submitter may have given up; result delivery is best-effort
        let _ = task.reply.send(result);

        let elapsed = started.elapsed();
        if elapsed < min_delay {
            tokio::time::sleep(min_delay - elapsed).await;
        }
    }
    debug!("mutation queue closed");
}

async fn execute(store: &dyn TableStore, op: MutationOp) -> DomainResult<MutationOutput> {
    match op {
        MutationOp::Create { table_id, fields } => store
            .create_record(&table_id, &fields)
            .await
            .map(MutationOutput::Record),
        MutationOp::Update { table_id, record_id, fields } => store
            .update_record(&table_id, &record_id, &fields)
            .await
            .map(MutationOutput::Record),
        MutationOp::BatchCreate { table_id, records } => store
            .batch_create_records(&table_id, &records)
            .await
            .map(MutationOutput::Records),
        MutationOp::BatchUpdate { table_id, updates } => store
            .batch_update_records(&table_id, &updates)
            .await
            .map(MutationOutput::Records),
    }
}
