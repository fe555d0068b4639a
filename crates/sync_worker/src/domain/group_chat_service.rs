use crate::domain::mutation_queue::MutationQueue;
use common::{
    diff_field_sets, field_changes, ChangeOutcome, DiffOptions, DomainResult, FieldSet,
    FieldValue, GroupChat, GroupChatSource, GroupChatSummary, UniqueKeyResolver,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone)]
pub struct GroupChatSyncConfig {
    pub table_id: String,
    pub key_field: String,
}

impl GroupChatSyncConfig {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self { table_id: table_id.into(), key_field: "chat_id".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSyncOutcome {
    pub chat_id: String,
    pub name: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GroupChatSyncReport {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<ChatSyncOutcome>,
}

/// Upserts the chat vendor's group roster into the store.
///
/// Each chat is diffed against its existing record(s); only the changed
/// field subset is written, and unchanged chats produce no mutation at all.
pub struct GroupChatSyncService {
    source: Arc<dyn GroupChatSource>,
    resolver: UniqueKeyResolver,
    queue: Arc<MutationQueue>,
    diff: DiffOptions,
    config: GroupChatSyncConfig,
}

impl GroupChatSyncService {
    pub fn new(
        source: Arc<dyn GroupChatSource>,
        resolver: UniqueKeyResolver,
        queue: Arc<MutationQueue>,
        diff: DiffOptions,
        config: GroupChatSyncConfig,
    ) -> Self {
        Self { source, resolver, queue, diff, config }
    }

    #[instrument(skip(self), fields(table_id = %self.config.table_id))]
    pub async fn sync_all(&self) -> DomainResult<GroupChatSyncReport> {
        let chats = self.source.list_group_chats().await?;
        let mut report = GroupChatSyncReport { total: chats.len(), ..Default::default() };

        for summary in &chats {
            match self.sync_one(summary).await {
                Ok(outcome) => {
                    match outcome.action {
                        "create" => report.created += 1,
                        "update" => report.updated += 1,
                        _ => report.skipped += 1,
                    }
                    report.results.push(outcome);
                }
                Err(e) => {
                    error!(chat_id = %summary.chat_id, error = %e, "group chat sync failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "group chat sync finished"
        );
        Ok(report)
    }

    async fn sync_one(&self, summary: &GroupChatSummary) -> DomainResult<ChatSyncOutcome> {
        let chat = self.source.get_group_chat(&summary.chat_id).await?;
        let fields = Self::chat_fields(&chat, summary.status);

        let existing = self
            .resolver
            .find_all_by_unique_key(&self.config.table_id, &self.config.key_field, &chat.chat_id)
            .await?;

        if existing.is_empty() {
            let change = diff_field_sets(None, &fields, &self.diff);
            let record = self
                .queue
                .create_record(&self.config.table_id, change.changed)
                .await?;
            return Ok(ChatSyncOutcome {
                chat_id: chat.chat_id,
                name: chat.name,
                action: ChangeOutcome::Create.as_str(),
                record_id: Some(record.record_id),
            });
        }

        // Broadcast: every record sharing the key gets its own diffed update
        let mut updated_record = None;
        for record in &existing {
            let change = diff_field_sets(Some(&record.fields), &fields, &self.diff);
            if change.outcome == ChangeOutcome::Update {
                for fc in field_changes(&record.fields, &change.changed) {
                    debug!(
                        chat_id = %chat.chat_id,
                        record_id = %record.record_id,
                        field = %fc.field,
                        old = ?fc.old,
                        new = ?fc.new,
                        "field changed"
                    );
                }
                self.queue
                    .update_record(&self.config.table_id, &record.record_id, change.changed)
                    .await?;
                updated_record.get_or_insert_with(|| record.record_id.clone());
            }
        }

        let action = if updated_record.is_some() {
            ChangeOutcome::Update.as_str()
        } else {
            ChangeOutcome::Skip.as_str()
        };
        Ok(ChatSyncOutcome {
            chat_id: chat.chat_id,
            name: chat.name,
            action,
            record_id: updated_record.or_else(|| existing.first().map(|r| r.record_id.clone())),
        })
    }

    fn chat_fields(chat: &GroupChat, status: i64) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert("chat_id".to_string(), FieldValue::Text(chat.chat_id.clone()));
        fields.insert("name".to_string(), FieldValue::Text(chat.name.clone()));
        fields.insert("owner".to_string(), FieldValue::Text(chat.owner.clone()));
        fields.insert("notice".to_string(), FieldValue::Text(chat.notice.clone()));
        fields.insert(
            "status".to_string(),
            FieldValue::Text(if status == 0 { "normal" } else { "dismissed" }.to_string()),
        );
        fields.insert(
            "create_time".to_string(),
            FieldValue::Number((chat.create_time * 1000) as f64),
        );
        fields.insert(
            "member_count".to_string(),
            FieldValue::Number(chat.member_count as f64),
        );
        fields.insert("admin_count".to_string(), FieldValue::Number(chat.admin_count as f64));
        fields.insert(
            "member_version".to_string(),
            FieldValue::Text(chat.member_version.clone()),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MockGroupChatSource, MockTableStore, SearchPage, TableRecord};
    use std::time::Duration;

    fn chat(chat_id: &str, member_count: usize) -> GroupChat {
        GroupChat {
            chat_id: chat_id.to_string(),
            name: format!("name-{chat_id}"),
            owner: "owner".to_string(),
            create_time: 1_715_000_000,
            notice: "".to_string(),
            member_count,
            admin_count: 1,
            member_version: "v1".to_string(),
        }
    }

    fn summary(chat_id: &str) -> GroupChatSummary {
        GroupChatSummary { chat_id: chat_id.to_string(), status: 0 }
    }

    fn service(source: MockGroupChatSource, store: MockTableStore) -> GroupChatSyncService {
        let store: Arc<dyn common::TableStore> = Arc::new(store);
        GroupChatSyncService::new(
            Arc::new(source),
            UniqueKeyResolver::new(store.clone()),
            Arc::new(MutationQueue::start(store, Duration::ZERO)),
            DiffOptions::new(),
            GroupChatSyncConfig::new("tbl"),
        )
    }

    #[tokio::test]
    async fn unknown_chat_is_created() {
        // Arrange
        let mut source = MockGroupChatSource::new();
        source
            .expect_list_group_chats()
            .times(1)
            .return_once(|| Ok(vec![summary("wr1")]));
        source
            .expect_get_group_chat()
            .times(1)
            .return_once(|_| Ok(chat("wr1", 10)));
        let mut store = MockTableStore::new();
        store
            .expect_search_records()
            .times(1)
            .return_once(|_, _| Ok(SearchPage { items: vec![], next_page_token: None }));
        store
            .expect_create_record()
            .withf(|table, fields| {
                table == "tbl"
                    && fields.get("chat_id") == Some(&FieldValue::Text("wr1".to_string()))
                    && fields.get("status") == Some(&FieldValue::Text("normal".to_string()))
                    // Empty notice is dropped from the create set
                    && !fields.contains_key("notice")
            })
            .times(1)
            .returning(|_, fields| {
                Ok(TableRecord { record_id: "rec1".to_string(), fields: fields.clone() })
            });

        // Act
        let report = service(source, store).sync_all().await.unwrap();

        // Assert
        assert_eq!(report.created, 1);
        assert_eq!(report.results[0].action, "create");
        assert_eq!(report.results[0].record_id.as_deref(), Some("rec1"));
    }

    #[tokio::test]
    async fn unchanged_chat_is_skipped_without_writes() {
        // Arrange: stored record already equals the incoming fields
        let mut source = MockGroupChatSource::new();
        source
            .expect_list_group_chats()
            .times(1)
            .return_once(|| Ok(vec![summary("wr1")]));
        source
            .expect_get_group_chat()
            .times(1)
            .return_once(|_| Ok(chat("wr1", 10)));
        let mut store = MockTableStore::new();
        store.expect_search_records().times(1).return_once(|_, _| {
            let fields = GroupChatSyncService::chat_fields(&chat("wr1", 10), 0);
            Ok(SearchPage {
                items: vec![TableRecord { record_id: "rec1".to_string(), fields }],
                next_page_token: None,
            })
        });
        // No update expectation: a write would fail the test

        // Act
        let report = service(source, store).sync_all().await.unwrap();

        // Assert
        assert_eq!(report.skipped, 1);
        assert_eq!(report.results[0].action, "skip");
    }

    #[tokio::test]
    async fn changed_chat_updates_only_the_changed_subset() {
        // Arrange: member count moved from 10 to 12
        let mut source = MockGroupChatSource::new();
        source
            .expect_list_group_chats()
            .times(1)
            .return_once(|| Ok(vec![summary("wr1")]));
        source
            .expect_get_group_chat()
            .times(1)
            .return_once(|_| Ok(chat("wr1", 12)));
        let mut store = MockTableStore::new();
        store.expect_search_records().times(1).return_once(|_, _| {
            let fields = GroupChatSyncService::chat_fields(&chat("wr1", 10), 0);
            Ok(SearchPage {
                items: vec![TableRecord { record_id: "rec1".to_string(), fields }],
                next_page_token: None,
            })
        });
        store
            .expect_update_record()
            .withf(|_, record_id, fields| {
                record_id == "rec1"
                    && fields.len() == 1
                    && fields.get("member_count") == Some(&FieldValue::Number(12.0))
            })
            .times(1)
            .returning(|_, record_id, fields| {
                Ok(TableRecord { record_id: record_id.to_string(), fields: fields.clone() })
            });

        // Act
        let report = service(source, store).sync_all().await.unwrap();

        // Assert
        assert_eq!(report.updated, 1);
        assert_eq!(report.results[0].action, "update");
    }

    #[tokio::test]
    async fn key_conflicts_broadcast_the_update_to_every_match() {
        // Arrange: two records share the chat id, both are stale
        let mut source = MockGroupChatSource::new();
        source
            .expect_list_group_chats()
            .times(1)
            .return_once(|| Ok(vec![summary("wr1")]));
        source
            .expect_get_group_chat()
            .times(1)
            .return_once(|_| Ok(chat("wr1", 12)));
        let mut store = MockTableStore::new();
        store.expect_search_records().times(1).return_once(|_, _| {
            let fields = GroupChatSyncService::chat_fields(&chat("wr1", 10), 0);
            Ok(SearchPage {
                items: vec![
                    TableRecord { record_id: "rec1".to_string(), fields: fields.clone() },
                    TableRecord { record_id: "rec2".to_string(), fields },
                ],
                next_page_token: None,
            })
        });
        store.expect_update_record().times(2).returning(|_, record_id, fields| {
            Ok(TableRecord { record_id: record_id.to_string(), fields: fields.clone() })
        });

        // Act
        let report = service(source, store).sync_all().await.unwrap();

        // Assert
        assert_eq!(report.updated, 1);
    }

    #[tokio::test]
    async fn one_failing_chat_does_not_stop_the_roster() {
        // Arrange
        let mut source = MockGroupChatSource::new();
        source
            .expect_list_group_chats()
            .times(1)
            .return_once(|| Ok(vec![summary("bad"), summary("good")]));
        source
            .expect_get_group_chat()
            .withf(|chat_id| chat_id == "bad")
            .times(1)
            .return_once(|_| {
                Err(common::DomainError::VendorApi { code: 40003, message: "no such chat".into() })
            });
        source
            .expect_get_group_chat()
            .withf(|chat_id| chat_id == "good")
            .times(1)
            .return_once(|_| Ok(chat("good", 5)));
        let mut store = MockTableStore::new();
        store
            .expect_search_records()
            .times(1)
            .return_once(|_, _| Ok(SearchPage { items: vec![], next_page_token: None }));
        store.expect_create_record().times(1).returning(|_, fields| {
            Ok(TableRecord { record_id: "rec-good".to_string(), fields: fields.clone() })
        });

        // Act
        let report = service(source, store).sync_all().await.unwrap();

        // Assert
        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
    }
}
