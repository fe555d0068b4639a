use crate::domain::mutation_queue::MutationQueue;
use common::{
    ChangeOutcome, CheckoutSession, DomainResult, FieldSet, FieldValue, UniqueKeyResolver,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub table_id: String,
    pub key_field: String,
}

impl PaymentConfig {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self { table_id: table_id.into(), key_field: "channel_order_id".to_string() }
    }
}

/// Ingests completed checkout sessions as charge records, keyed by the
/// vendor's order id so replayed events never duplicate
pub struct PaymentService {
    resolver: UniqueKeyResolver,
    queue: Arc<MutationQueue>,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(resolver: UniqueKeyResolver, queue: Arc<MutationQueue>, config: PaymentConfig) -> Self {
        Self { resolver, queue, config }
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn handle_checkout_completed(
        &self,
        session: &CheckoutSession,
    ) -> DomainResult<ChangeOutcome> {
        let existing = self
            .resolver
            .find_all_by_unique_key(&self.config.table_id, &self.config.key_field, &session.id)
            .await?;
        if !existing.is_empty() {
            debug!("charge already recorded, skipping");
            return Ok(ChangeOutcome::Skip);
        }

        self.queue
            .create_record(&self.config.table_id, Self::charge_fields(session))
            .await?;
        Ok(ChangeOutcome::Create)
    }

    fn charge_fields(session: &CheckoutSession) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert("channel_order_id".to_string(), FieldValue::Text(session.id.clone()));
        // Vendor amounts are minor units, the store column is major units
        fields.insert(
            "real_price".to_string(),
            FieldValue::Number(session.amount_total as f64 / 100.0),
        );
        fields.insert(
            "currency_unit".to_string(),
            FieldValue::Text(session.currency.to_uppercase()),
        );
        fields.insert(
            "pay_time".to_string(),
            FieldValue::Number((session.created * 1000) as f64),
        );
        if let Some(details) = &session.customer_details {
            if let Some(email) = &details.email {
                fields.insert("email".to_string(), FieldValue::Text(email.clone()));
            }
            if let Some(phone) = &details.phone {
                fields.insert("phone".to_string(), FieldValue::Text(phone.clone()));
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerDetails, MockTableStore, SearchPage, TableRecord};
    use std::time::Duration;

    fn session() -> CheckoutSession {
        CheckoutSession {
            id: "cs_test_123".to_string(),
            amount_total: 12_800,
            currency: "usd".to_string(),
            created: 1_715_000_000,
            customer_details: Some(CustomerDetails {
                email: Some("buyer@example.com".to_string()),
                phone: None,
            }),
        }
    }

    fn service(store: MockTableStore) -> PaymentService {
        let store: Arc<dyn common::TableStore> = Arc::new(store);
        PaymentService::new(
            UniqueKeyResolver::new(store.clone()),
            Arc::new(MutationQueue::start(store, Duration::ZERO)),
            PaymentConfig::new("tbl"),
        )
    }

    #[tokio::test]
    async fn first_delivery_creates_the_charge_record() {
        // Arrange
        let mut store = MockTableStore::new();
        store
            .expect_search_records()
            .times(1)
            .return_once(|_, _| Ok(SearchPage { items: vec![], next_page_token: None }));
        store
            .expect_create_record()
            .withf(|table, fields| {
                table == "tbl"
                    && fields.get("channel_order_id")
                        == Some(&FieldValue::Text("cs_test_123".to_string()))
                    && fields.get("real_price") == Some(&FieldValue::Number(128.0))
                    && fields.get("currency_unit") == Some(&FieldValue::Text("USD".to_string()))
                    && fields.get("pay_time") == Some(&FieldValue::Number(1_715_000_000_000.0))
                    && fields.get("email")
                        == Some(&FieldValue::Text("buyer@example.com".to_string()))
                    && !fields.contains_key("phone")
            })
            .times(1)
            .returning(|_, fields| {
                Ok(TableRecord { record_id: "rec1".to_string(), fields: fields.clone() })
            });

        // Act
        let outcome = service(store).handle_checkout_completed(&session()).await.unwrap();

        // Assert
        assert_eq!(outcome, ChangeOutcome::Create);
    }

    #[tokio::test]
    async fn replayed_event_is_skipped() {
        // Arrange
        let mut store = MockTableStore::new();
        store.expect_search_records().times(1).return_once(|_, _| {
            let mut fields = FieldSet::new();
            fields.insert(
                "channel_order_id".to_string(),
                FieldValue::Text("cs_test_123".to_string()),
            );
            Ok(SearchPage {
                items: vec![TableRecord { record_id: "rec1".to_string(), fields }],
                next_page_token: None,
            })
        });
        // No create expectation: a write would fail the test

        // Act
        let outcome = service(store).handle_checkout_completed(&session()).await.unwrap();

        // Assert
        assert_eq!(outcome, ChangeOutcome::Skip);
    }
}
