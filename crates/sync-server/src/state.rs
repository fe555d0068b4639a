use crate::config::ServiceConfig;
use anyhow::Context;
use bitable_store::{BitableClient, BitableStore};
use common::{DiffOptions, TableStore, UniqueKeyResolver};
use envelope_crypto::{ChatCrypto, MeetingCrypto};
use std::sync::Arc;
use std::time::Duration;
use sync_worker::{
    ChatWebhookHandler, GroupChatSyncConfig, GroupChatSyncService, MeetingWebhookHandler,
    MutationQueue, PaymentConfig, PaymentService, PaymentWebhookHandler, RecordingEventConfig,
    RecordingEventService, RecordingSyncService, SyncConfig,
};
use tracing::info;
use vendor_http::{ChatClient, HttpArtifactFetcher, MeetingClient};

pub struct MeetingState {
    pub webhook: MeetingWebhookHandler,
    pub sync: Arc<RecordingSyncService>,
}

pub struct ChatState {
    pub webhook: ChatWebhookHandler,
    pub sync: Arc<GroupChatSyncService>,
}

/// Fully wired services behind the router. Vendors without credentials
/// stay `None` and their routes answer 503.
pub struct AppState {
    pub meeting: Option<MeetingState>,
    pub chat: Option<ChatState>,
    pub payment: Option<PaymentWebhookHandler>,
}

impl AppState {
    pub fn build(config: &ServiceConfig, http: reqwest::Client) -> anyhow::Result<Self> {
        let store: Arc<dyn TableStore> =
            Arc::new(BitableStore::new(BitableClient::new(http.clone(), config.store())));
        let queue = Arc::new(MutationQueue::start(
            store.clone(),
            Duration::from_millis(config.mutation_delay_ms),
        ));

        let meeting = match config.meeting_settings() {
            Some(settings) => {
                let crypto = MeetingCrypto::new(&settings.callback_token, &settings.aes_key)
                    .context("meeting callback aes key")?;
                let source = Arc::new(MeetingClient::new(http.clone(), settings.api));
                let events = RecordingEventService::new(
                    source.clone(),
                    Arc::new(HttpArtifactFetcher::new(http.clone())),
                    UniqueKeyResolver::new(store.clone()),
                    queue.clone(),
                    RecordingEventConfig::new(&settings.table_id),
                );
                let mut sync_config = SyncConfig::new(&settings.table_id);
                sync_config.page_size = config.sync_page_size;
                sync_config.batch_size = config.sync_batch_size;
                let sync = RecordingSyncService::new(
                    source,
                    UniqueKeyResolver::new(store.clone()),
                    queue.clone(),
                    sync_config,
                );
                info!(table_id = %settings.table_id, "meeting vendor configured");
                Some(MeetingState {
                    webhook: MeetingWebhookHandler::new(crypto, Arc::new(events)),
                    sync: Arc::new(sync),
                })
            }
            None => None,
        };

        let chat = match config.chat_settings() {
            Some(settings) => {
                // Callback envelopes are addressed to the corp id
                let crypto = ChatCrypto::new(
                    &settings.callback_token,
                    &settings.aes_key,
                    &settings.api.corp_id,
                )
                .context("chat callback aes key")?;
                let source = Arc::new(ChatClient::new(http.clone(), settings.api));
                let sync = GroupChatSyncService::new(
                    source,
                    UniqueKeyResolver::new(store.clone()),
                    queue.clone(),
                    DiffOptions::new(),
                    GroupChatSyncConfig::new(&settings.table_id),
                );
                info!(table_id = %settings.table_id, "chat vendor configured");
                Some(ChatState {
                    webhook: ChatWebhookHandler::new(crypto),
                    sync: Arc::new(sync),
                })
            }
            None => None,
        };

        let payment = config.payment_settings().map(|settings| {
            let service = PaymentService::new(
                UniqueKeyResolver::new(store.clone()),
                queue.clone(),
                PaymentConfig::new(&settings.table_id),
            );
            info!(table_id = %settings.table_id, "payment vendor configured");
            PaymentWebhookHandler::new(settings.secret, Arc::new(service))
        });

        Ok(Self { meeting, chat, payment })
    }
}
