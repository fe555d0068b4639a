use crate::domain::mutation_queue::MutationQueue;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{
    ArtifactFetcher, DomainResult, FieldSet, FieldValue, MeetingEvent, MeetingInfo, Participant,
    RecordingFileRef, RecordingSource, UniqueKeyResolver,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone)]
pub struct RecordingEventConfig {
    pub table_id: String,
    pub key_field: String,
}

impl RecordingEventConfig {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self { table_id: table_id.into(), key_field: "record_file_id".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingIngestReport {
    pub files: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Push-path handler for the recording-completed event.
///
/// Each recording file is ingested independently: already-known files are
/// skipped, new ones get a base record immediately and artifact/participant
/// enrichment afterwards. Enrichment failures never lose the base record.
pub struct RecordingEventService {
    source: Arc<dyn RecordingSource>,
    fetcher: Arc<dyn ArtifactFetcher>,
    resolver: UniqueKeyResolver,
    queue: Arc<MutationQueue>,
    config: RecordingEventConfig,
}

impl RecordingEventService {
    pub fn new(
        source: Arc<dyn RecordingSource>,
        fetcher: Arc<dyn ArtifactFetcher>,
        resolver: UniqueKeyResolver,
        queue: Arc<MutationQueue>,
        config: RecordingEventConfig,
    ) -> Self {
        Self { source, fetcher, resolver, queue, config }
    }

    #[instrument(skip(self, event), fields(event = %event.event))]
    pub async fn handle_recording_completed(
        &self,
        event: &MeetingEvent,
    ) -> DomainResult<RecordingIngestReport> {
        let mut report = RecordingIngestReport { files: 0, created: 0, skipped: 0, failed: 0 };

        for payload in &event.payload {
            for file in &payload.recording_files {
                report.files += 1;
                match self.ingest_file(&payload.meeting_info, file).await {
                    Ok(true) => report.created += 1,
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        error!(
                            record_file_id = %file.record_file_id,
                            error = %e,
                            "failed to ingest recording file"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        debug!(?report, "recording event handled");
        Ok(report)
    }

    /// Returns true when a record was created, false when already present
    async fn ingest_file(&self, info: &MeetingInfo, file: &RecordingFileRef) -> DomainResult<bool> {
        let existing = self
            .resolver
            .find_all_by_unique_key(&self.config.table_id, &self.config.key_field, &file.record_file_id)
            .await?;
        if !existing.is_empty() {
            debug!(record_file_id = %file.record_file_id, "recording already ingested, skipping");
            return Ok(false);
        }

        let record = self
            .queue
            .create_record(&self.config.table_id, Self::base_fields(info, file))
            .await?;

        self.enrich(&record.record_id, info, file).await;
        Ok(true)
    }

    fn base_fields(info: &MeetingInfo, file: &RecordingFileRef) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert(
            "record_file_id".to_string(),
            FieldValue::Text(file.record_file_id.clone()),
        );
        fields.insert("meeting_id".to_string(), FieldValue::Text(info.meeting_id.clone()));
        fields.insert("meeting_code".to_string(), FieldValue::Text(info.meeting_code.clone()));
        fields.insert("subject".to_string(), FieldValue::Text(info.subject.clone()));
        fields.insert("userid".to_string(), FieldValue::Text(info.creator.userid.clone()));
        fields.insert("user_name".to_string(), FieldValue::Text(info.creator.user_name.clone()));
        // Event carries unix seconds, the store columns are epoch millis
        fields.insert(
            "start_time".to_string(),
            FieldValue::Number((info.start_time * 1000) as f64),
        );
        fields.insert("end_time".to_string(), FieldValue::Number((info.end_time * 1000) as f64));
        fields
    }

    /// Best-effort second pass: transcript texts and the participant roster
    async fn enrich(&self, record_id: &str, info: &MeetingInfo, file: &RecordingFileRef) {
        let mut update = FieldSet::new();

        match self
            .source
            .get_recording_artifacts(&file.record_file_id, &info.creator.userid)
            .await
        {
            Ok(artifacts) => {
                let texts = [
                    ("meeting_summary", artifacts.summary_url),
                    ("meeting_transcripts", artifacts.transcript_url),
                    ("meeting_minutes", artifacts.minutes_url),
                ];
                for (field, url) in texts {
                    let Some(url) = url else { continue };
                    match self.fetcher.fetch_text(&url).await {
                        Ok(text) => {
                            update.insert(field.to_string(), FieldValue::Text(text));
                        }
                        Err(e) => warn!(field, error = %e, "artifact text fetch failed"),
                    }
                }
            }
            Err(e) => {
                warn!(record_file_id = %file.record_file_id, error = %e, "artifact lookup failed")
            }
        }

        match self
            .source
            .get_participants(&info.meeting_id, &info.creator.userid, info.sub_meeting_id.as_deref())
            .await
        {
            Ok(participants) => {
                let roster = Self::participant_roster(&participants);
                if !roster.is_empty() {
                    update.insert("participants".to_string(), FieldValue::Text(roster));
                }
            }
            Err(e) => warn!(meeting_id = %info.meeting_id, error = %e, "participant lookup failed"),
        }

        if update.is_empty() {
            return;
        }
        if let Err(e) = self
            .queue
            .update_record(&self.config.table_id, record_id, update)
            .await
        {
            error!(record_id, error = %e, "enrichment update failed");
        }
    }

    /// Decode the base64 display names, de-duplicate preserving order, join
    fn participant_roster(participants: &[Participant]) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::new();
        for participant in participants {
            let name = BASE64
                .decode(&participant.user_name)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or_else(|| participant.user_name.clone());
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
        names.join(", ")
    }
}
