use crate::domain::mutation_queue::MutationQueue;
use common::{
    DomainError, DomainResult, FieldSet, FieldValue, RecordMeeting, RecordingFile,
    RecordingSource, UniqueKeyResolver,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const DEFAULT_WINDOW_SECS: i64 = 31 * 86_400;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub table_id: String,
    pub key_field: String,
    pub page_size: u32,
    pub batch_size: usize,
    pub window_secs: i64,
}

impl SyncConfig {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            key_field: "record_file_id".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

/// Outcome summary of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub windows: usize,
    pub total_found: usize,
    pub already_present: usize,
    pub created: usize,
    pub failed: usize,
}

/// Pull-based incremental reconciliation of source recordings into the store.
///
/// Idempotent by construction: the store's existing key set is collected
/// before any write, and only missing keys are created. Re-running a range
/// is a no-op for records that already landed.
pub struct RecordingSyncService {
    source: Arc<dyn RecordingSource>,
    resolver: UniqueKeyResolver,
    queue: Arc<MutationQueue>,
    config: SyncConfig,
}

impl RecordingSyncService {
    pub fn new(
        source: Arc<dyn RecordingSource>,
        resolver: UniqueKeyResolver,
        queue: Arc<MutationQueue>,
        config: SyncConfig,
    ) -> Self {
        Self { source, resolver, queue, config }
    }

    /// Reconcile `[start, end)` (unix seconds) into the store
    #[instrument(skip(self), fields(table_id = %self.config.table_id))]
    pub async fn sync_range(&self, start: i64, end: i64) -> DomainResult<SyncReport> {
        if end <= start {
            return Err(DomainError::ValidationError(
                "end_time must be after start_time".to_string(),
            ));
        }

        let (candidates, windows) = self.collect_candidates(start, end).await?;
        let total_found = candidates.len();
        info!(total_found, windows, "collected recording files from source");

        // The full key scan must succeed; creating without it could duplicate
        let existing = self
            .resolver
            .collect_key_values(&self.config.table_id, &self.config.key_field)
            .await?;

        let mut seen = HashSet::new();
        let fresh: Vec<FieldSet> = candidates
            .into_iter()
            .filter(|(key, _)| !existing.contains(key) && seen.insert(key.clone()))
            .map(|(_, fields)| fields)
            .collect();
        let already_present = total_found - fresh.len();

        let mut created = 0usize;
        let mut failed = 0usize;
        for chunk in fresh.chunks(self.config.batch_size) {
            match self
                .queue
                .batch_create_records(&self.config.table_id, chunk.to_vec())
                .await
            {
                Ok(records) => created += records.len(),
                Err(e) => {
                    error!(error = %e, chunk_size = chunk.len(), "batch create failed");
                    failed += chunk.len();
                }
            }
        }

        let report = SyncReport { windows, total_found, already_present, created, failed };
        info!(?report, "reconciliation run finished");
        Ok(report)
    }

    async fn collect_candidates(
        &self,
        start: i64,
        end: i64,
    ) -> DomainResult<(Vec<(String, FieldSet)>, usize)> {
        let mut candidates = Vec::new();
        let mut windows = 0usize;
        let mut window_start = start;

        while window_start < end {
            let window_end = (window_start + self.config.window_secs).min(end);
            windows += 1;
            debug!(window_start, window_end, "listing window");

            let mut page = 1u32;
            loop {
                let listed = self
                    .source
                    .list_recordings(window_start, window_end, self.config.page_size, page)
                    .await?;
                for meeting in &listed.meetings {
                    for file in &meeting.record_files {
                        candidates.push((
                            file.record_file_id.clone(),
                            Self::record_fields(meeting, file),
                        ));
                    }
                }
                if listed.total_page == 0 || listed.current_page >= listed.total_page {
                    break;
                }
                page = listed.current_page + 1;
            }

            window_start = window_end;
        }
        Ok((candidates, windows))
    }

    fn record_fields(meeting: &RecordMeeting, file: &RecordingFile) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert(
            "record_file_id".to_string(),
            FieldValue::Text(file.record_file_id.clone()),
        );
        fields.insert("meeting_id".to_string(), FieldValue::Text(meeting.meeting_id.clone()));
        fields.insert(
            "meeting_code".to_string(),
            FieldValue::Text(meeting.meeting_code.clone()),
        );
        fields.insert("subject".to_string(), FieldValue::Text(meeting.subject.clone()));
        fields.insert("userid".to_string(), FieldValue::Text(meeting.userid.clone()));
        fields.insert(
            "start_time".to_string(),
            FieldValue::Number(file.record_start_time as f64),
        );
        fields.insert(
            "end_time".to_string(),
            FieldValue::Number(file.record_end_time as f64),
        );
        fields
    }
}
