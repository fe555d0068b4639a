use crate::domain::PaymentService;
use crate::webhook::request::{Method, WebhookRequest, WebhookResponse};
use common::PaymentEvent;
use envelope_crypto::verify_payment_signature;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const SIGNATURE_HEADER: &str = "stripe-signature";
const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Payment vendor webhook: HMAC-verified POST events
pub struct PaymentWebhookHandler {
    secret: String,
    tolerance_secs: Option<i64>,
    payments: Arc<PaymentService>,
}

impl PaymentWebhookHandler {
    pub fn new(secret: impl Into<String>, payments: Arc<PaymentService>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: Some(DEFAULT_TOLERANCE_SECS),
            payments,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn handle(&self, request: &WebhookRequest) -> WebhookResponse {
        if request.method != Method::Post {
            return WebhookResponse::bad_request("unsupported method");
        }
        let Some(signature) = request.header(SIGNATURE_HEADER) else {
            return WebhookResponse::bad_request("missing signature header");
        };

        let now = chrono::Utc::now().timestamp();
        if let Err(e) =
            verify_payment_signature(&self.secret, signature, &request.body, now, self.tolerance_secs)
        {
            // The payment vendor expects 400 on any verification failure
            warn!(error = %e, "payment signature rejected");
            return WebhookResponse::bad_request("signature verification failed");
        }

        let event: PaymentEvent = match serde_json::from_str(&request.body) {
            Ok(event) => event,
            Err(e) => return WebhookResponse::bad_request(format!("invalid event: {e}")),
        };

        if event.event_type != CHECKOUT_COMPLETED {
            info!(event_type = %event.event_type, "ignoring unhandled payment event");
            return WebhookResponse::json(r#"{"received":true}"#);
        }

        match self.payments.handle_checkout_completed(&event.data.object).await {
            Ok(outcome) => {
                info!(outcome = outcome.as_str(), session_id = %event.data.object.id, "checkout recorded");
                WebhookResponse::json(r#"{"received":true}"#)
            }
            Err(e) => {
                error!(error = %e, "checkout processing failed");
                WebhookResponse::server_error("event processing failed")
            }
        }
    }

    #[cfg(test)]
    fn without_tolerance(mut self) -> Self {
        self.tolerance_secs = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MutationQueue, PaymentConfig};
    use common::{MockTableStore, SearchPage, TableRecord, UniqueKeyResolver};
    use hmac_test::sign_body;
    use std::time::Duration;

    mod hmac_test {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        pub fn sign_body(secret: &str, timestamp: i64, body: &str) -> String {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
            mac.update(format!("{timestamp}.{body}").as_bytes());
            format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
        }
    }

    fn handler(store: MockTableStore) -> PaymentWebhookHandler {
        let store: std::sync::Arc<dyn common::TableStore> = Arc::new(store);
        let payments = PaymentService::new(
            UniqueKeyResolver::new(store.clone()),
            Arc::new(MutationQueue::start(store, Duration::ZERO)),
            PaymentConfig::new("tbl"),
        );
        PaymentWebhookHandler::new("whsec_test", Arc::new(payments)).without_tolerance()
    }

    fn checkout_body() -> String {
        serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "amount_total": 500,
                "currency": "eur",
                "created": 1_715_000_000,
            }}
        })
        .to_string()
    }

    #[tokio::test]
    async fn verified_checkout_event_creates_a_record() {
        // Arrange
        let mut store = MockTableStore::new();
        store
            .expect_search_records()
            .times(1)
            .return_once(|_, _| Ok(SearchPage { items: vec![], next_page_token: None }));
        store.expect_create_record().times(1).returning(|_, fields| {
            Ok(TableRecord { record_id: "rec1".to_string(), fields: fields.clone() })
        });
        let body = checkout_body();
        let request = WebhookRequest::post(body.clone())
            .with_header(SIGNATURE_HEADER, &sign_body("whsec_test", 1_715_000_000, &body));

        // Act
        let response = handler(store).handle(&request).await;

        // Assert
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"received":true}"#);
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_without_store_calls() {
        // Arrange: no expectations, any store call fails the test
        let body = checkout_body();
        let request = WebhookRequest::post(body.clone())
            .with_header(SIGNATURE_HEADER, &sign_body("whsec_wrong", 1_715_000_000, &body));

        // Act
        let response = handler(MockTableStore::new()).handle(&request).await;

        // Assert
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn missing_signature_header_is_a_bad_request() {
        let response = handler(MockTableStore::new())
            .handle(&WebhookRequest::post(checkout_body()))
            .await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn unrelated_event_types_are_acknowledged() {
        // Arrange
        let body = serde_json::json!({
            "type": "invoice.paid",
            "data": { "object": { "id": "in_1" } }
        })
        .to_string();
        let request = WebhookRequest::post(body.clone())
            .with_header(SIGNATURE_HEADER, &sign_body("whsec_test", 1_715_000_000, &body));

        // Act
        let response = handler(MockTableStore::new()).handle(&request).await;

        // Assert
        assert_eq!(response.status, 200);
    }
}
