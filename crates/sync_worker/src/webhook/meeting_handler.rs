use crate::domain::RecordingEventService;
use crate::webhook::request::{envelope_rejection, Method, WebhookRequest, WebhookResponse};
use common::MeetingEvent;
use envelope_crypto::MeetingCrypto;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const RECORDING_COMPLETED: &str = "recording.completed";

#[derive(Debug, Deserialize)]
struct EventBody {
    data: String,
}

/// Meeting vendor webhook: GET handshake echo plus encrypted POST events
pub struct MeetingWebhookHandler {
    crypto: MeetingCrypto,
    events: Arc<RecordingEventService>,
}

impl MeetingWebhookHandler {
    pub fn new(crypto: MeetingCrypto, events: Arc<RecordingEventService>) -> Self {
        Self { crypto, events }
    }

    pub async fn handle(&self, request: &WebhookRequest) -> WebhookResponse {
        match request.method {
            Method::Get => self.handshake(request),
            Method::Post => self.event(request).await,
        }
    }

    /// URL validation: echo the decrypted check string as plain text
    #[instrument(skip(self, request))]
    fn handshake(&self, request: &WebhookRequest) -> WebhookResponse {
        let Some(check_str) = request.query("check_str") else {
            return WebhookResponse::bad_request("missing check_str");
        };
        let Some((timestamp, nonce, signature)) = Self::envelope_headers(request) else {
            return WebhookResponse::bad_request("missing signature headers");
        };

        match self.crypto.verify_and_decrypt(timestamp, nonce, check_str, signature) {
            Ok(plain) => {
                info!("handshake verified");
                WebhookResponse::text(plain)
            }
            Err(e) => {
                warn!(error = %e, "handshake rejected");
                envelope_rejection(&e)
            }
        }
    }

    #[instrument(skip(self, request))]
    async fn event(&self, request: &WebhookRequest) -> WebhookResponse {
        let Some((timestamp, nonce, signature)) = Self::envelope_headers(request) else {
            return WebhookResponse::bad_request("missing signature headers");
        };
        let body: EventBody = match serde_json::from_str(&request.body) {
            Ok(body) => body,
            Err(e) => return WebhookResponse::bad_request(format!("invalid body: {e}")),
        };

        let plain = match self.crypto.verify_and_decrypt(timestamp, nonce, &body.data, signature) {
            Ok(plain) => plain,
            Err(e) => {
                warn!(error = %e, "event envelope rejected");
                return envelope_rejection(&e);
            }
        };
        let event: MeetingEvent = match serde_json::from_str(&plain) {
            Ok(event) => event,
            Err(e) => return WebhookResponse::bad_request(format!("invalid event: {e}")),
        };

        match event.event.as_str() {
            RECORDING_COMPLETED => match self.events.handle_recording_completed(&event).await {
                Ok(report) => {
                    info!(?report, "recording event processed");
                    WebhookResponse::text("successfully received callback")
                }
                Err(e) => {
                    error!(error = %e, "recording event failed");
                    WebhookResponse::server_error("event processing failed")
                }
            },
            other => {
                info!(event = other, "ignoring unhandled event type");
                WebhookResponse::text("successfully received callback")
            }
        }
    }

    fn envelope_headers(request: &WebhookRequest) -> Option<(&str, &str, &str)> {
        Some((
            request.header("timestamp")?,
            request.header("nonce")?,
            request.header("signature")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MutationQueue, RecordingEventConfig};
    use common::{
        MockArtifactFetcher, MockRecordingSource, MockTableStore, SearchPage, TableRecord,
        UniqueKeyResolver,
    };
    use std::time::Duration;

    const KEY_B64: &str = "dGVzdC1hZXMta2V5LW1hdGVyaWFsLTMyLWJ5dGVzISE=";

    fn crypto() -> MeetingCrypto {
        MeetingCrypto::new("cb-token", KEY_B64).unwrap()
    }

    fn handler(store: MockTableStore, source: MockRecordingSource) -> MeetingWebhookHandler {
        let store: Arc<dyn common::TableStore> = Arc::new(store);
        let events = RecordingEventService::new(
            Arc::new(source),
            Arc::new(MockArtifactFetcher::new()),
            UniqueKeyResolver::new(store.clone()),
            Arc::new(MutationQueue::start(store, Duration::ZERO)),
            RecordingEventConfig::new("tbl"),
        );
        MeetingWebhookHandler::new(crypto(), Arc::new(events))
    }

    fn recording_event_json() -> String {
        serde_json::json!({
            "event": "recording.completed",
            "trace_id": "t1",
            "payload": [{
                "operate_time": 1_715_000_000_000i64,
                "meeting_info": {
                    "meeting_id": "m1",
                    "meeting_code": "999",
                    "subject": "sprint review",
                    "creator": { "userid": "owner", "user_name": "Owner" },
                    "start_time": 1_715_000_000,
                    "end_time": 1_715_003_600
                },
                "recording_files": [{ "record_file_id": "rf1" }]
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn handshake_echoes_the_decrypted_check_string() {
        // Arrange
        let sealed = crypto().seal("1715400000", "n1", "echo-me").unwrap();
        let request = WebhookRequest::get()
            .with_query("check_str", &sealed.payload)
            .with_header("timestamp", "1715400000")
            .with_header("nonce", "n1")
            .with_header("signature", &sealed.signature);
        let handler = handler(MockTableStore::new(), MockRecordingSource::new());

        // Act
        let response = handler.handle(&request).await;

        // Assert
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body, "echo-me");
    }

    #[tokio::test]
    async fn handshake_with_missing_headers_is_a_bad_request() {
        let request = WebhookRequest::get().with_query("check_str", "abc");
        let handler = handler(MockTableStore::new(), MockRecordingSource::new());

        let response = handler.handle(&request).await;

        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn bad_signature_is_forbidden_and_nothing_is_written() {
        // Arrange: mocks carry no expectations, any store call fails the test
        let sealed = crypto().seal("1715400000", "n1", &recording_event_json()).unwrap();
        let request = WebhookRequest::post(
            serde_json::json!({ "data": sealed.payload }).to_string(),
        )
        .with_header("timestamp", "1715400000")
        .with_header("nonce", "n1")
        .with_header("signature", "0000000000000000000000000000000000000000");
        let handler = handler(MockTableStore::new(), MockRecordingSource::new());

        // Act
        let response = handler.handle(&request).await;

        // Assert
        assert_eq!(response.status, 403);
    }

    #[tokio::test]
    async fn recording_completed_event_is_dispatched() {
        // Arrange
        let mut store = MockTableStore::new();
        store
            .expect_search_records()
            .times(1)
            .return_once(|_, _| Ok(SearchPage { items: vec![], next_page_token: None }));
        store.expect_create_record().times(1).returning(|_, fields| {
            Ok(TableRecord { record_id: "rec1".to_string(), fields: fields.clone() })
        });
        let mut source = MockRecordingSource::new();
        source
            .expect_get_recording_artifacts()
            .returning(|_, _| Ok(common::RecordingArtifacts::default()));
        source.expect_get_participants().returning(|_, _, _| Ok(vec![]));

        let sealed = crypto().seal("1715400000", "n1", &recording_event_json()).unwrap();
        let request = WebhookRequest::post(
            serde_json::json!({ "data": sealed.payload }).to_string(),
        )
        .with_header("timestamp", "1715400000")
        .with_header("nonce", "n1")
        .with_header("signature", &sealed.signature);
        let handler = handler(store, source);

        // Act
        let response = handler.handle(&request).await;

        // Assert
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "successfully received callback");
    }

    #[tokio::test]
    async fn unknown_event_types_are_acknowledged() {
        // Arrange
        let plain = serde_json::json!({ "event": "meeting.started", "payload": [] }).to_string();
        let sealed = crypto().seal("1715400000", "n1", &plain).unwrap();
        let request = WebhookRequest::post(
            serde_json::json!({ "data": sealed.payload }).to_string(),
        )
        .with_header("timestamp", "1715400000")
        .with_header("nonce", "n1")
        .with_header("signature", &sealed.signature);
        let handler = handler(MockTableStore::new(), MockRecordingSource::new());

        // Act
        let response = handler.handle(&request).await;

        // Assert
        assert_eq!(response.status, 200);
    }
}
