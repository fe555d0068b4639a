use bitable_store::BitableConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use vendor_http::{ChatApiConfig, MeetingApiConfig};

/// Flat environment-driven configuration, prefix `SYNCD_`.
///
/// The table store credentials are always required. Each webhook vendor is
/// optional: when its variables are absent the matching routes answer 503.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Listen address for the HTTP server
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Minimum spacing between store mutations in milliseconds
    #[serde(default = "default_mutation_delay_ms")]
    pub mutation_delay_ms: u64,

    // Table store
    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,
    pub store_app_id: String,
    pub store_app_secret: String,
    pub store_app_token: String,

    /// Listing page size for backfill runs
    #[serde(default = "default_sync_page_size")]
    pub sync_page_size: u32,

    /// Chunk size for batched record creation
    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: usize,

    // Meeting vendor (recordings)
    pub meeting_table_id: Option<String>,
    pub meeting_callback_token: Option<String>,
    pub meeting_aes_key: Option<String>,
    #[serde(default = "default_meeting_api_base_url")]
    pub meeting_api_base_url: String,
    pub meeting_app_id: Option<String>,
    pub meeting_sdk_id: Option<String>,
    pub meeting_secret_id: Option<String>,
    pub meeting_secret_key: Option<String>,

    // Chat vendor (group chats)
    pub chat_table_id: Option<String>,
    pub chat_corp_id: Option<String>,
    pub chat_secret: Option<String>,
    pub chat_callback_token: Option<String>,
    pub chat_aes_key: Option<String>,
    #[serde(default = "default_chat_api_base_url")]
    pub chat_api_base_url: String,

    // Payment vendor (charges)
    pub payment_table_id: Option<String>,
    pub payment_secret: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_mutation_delay_ms() -> u64 {
    2000
}

fn default_store_base_url() -> String {
    "https://open.feishu.cn".to_string()
}

fn default_sync_page_size() -> u32 {
    20
}

fn default_sync_batch_size() -> usize {
    100
}

fn default_meeting_api_base_url() -> String {
    "https://api.meeting.qq.com".to_string()
}

fn default_chat_api_base_url() -> String {
    "https://qyapi.weixin.qq.com".to_string()
}

/// Everything needed to serve the meeting webhook and backfill recordings
#[derive(Debug, Clone)]
pub struct MeetingSettings {
    pub table_id: String,
    pub callback_token: String,
    pub aes_key: String,
    pub api: MeetingApiConfig,
}

/// Everything needed to serve the chat webhook and sync group chats
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub table_id: String,
    pub callback_token: String,
    pub aes_key: String,
    pub api: ChatApiConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub table_id: String,
    pub secret: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SYNCD"))
            .build()?
            .try_deserialize()
    }

    pub fn store(&self) -> BitableConfig {
        BitableConfig {
            base_url: self.store_base_url.clone(),
            app_id: self.store_app_id.clone(),
            app_secret: self.store_app_secret.clone(),
            app_token: self.store_app_token.clone(),
        }
    }

    /// None unless every required meeting variable is set
    pub fn meeting_settings(&self) -> Option<MeetingSettings> {
        Some(MeetingSettings {
            table_id: self.meeting_table_id.clone()?,
            callback_token: self.meeting_callback_token.clone()?,
            aes_key: self.meeting_aes_key.clone()?,
            api: MeetingApiConfig {
                base_url: self.meeting_api_base_url.clone(),
                app_id: self.meeting_app_id.clone()?,
                sdk_id: self.meeting_sdk_id.clone(),
                secret_id: self.meeting_secret_id.clone()?,
                secret_key: self.meeting_secret_key.clone()?,
            },
        })
    }

    /// None unless every required chat variable is set
    pub fn chat_settings(&self) -> Option<ChatSettings> {
        Some(ChatSettings {
            table_id: self.chat_table_id.clone()?,
            callback_token: self.chat_callback_token.clone()?,
            aes_key: self.chat_aes_key.clone()?,
            api: ChatApiConfig {
                base_url: self.chat_api_base_url.clone(),
                corp_id: self.chat_corp_id.clone()?,
                chat_secret: self.chat_secret.clone()?,
            },
        })
    }

    pub fn payment_settings(&self) -> Option<PaymentSettings> {
        Some(PaymentSettings {
            table_id: self.payment_table_id.clone()?,
            secret: self.payment_secret.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const OPTIONAL_VARS: &[&str] = &[
        "SYNCD_LOG_LEVEL",
        "SYNCD_LISTEN_ADDR",
        "SYNCD_MUTATION_DELAY_MS",
        "SYNCD_MEETING_TABLE_ID",
        "SYNCD_MEETING_CALLBACK_TOKEN",
        "SYNCD_MEETING_AES_KEY",
        "SYNCD_MEETING_APP_ID",
        "SYNCD_MEETING_SDK_ID",
        "SYNCD_MEETING_SECRET_ID",
        "SYNCD_MEETING_SECRET_KEY",
        "SYNCD_CHAT_TABLE_ID",
        "SYNCD_CHAT_CORP_ID",
        "SYNCD_CHAT_SECRET",
        "SYNCD_CHAT_CALLBACK_TOKEN",
        "SYNCD_CHAT_AES_KEY",
        "SYNCD_PAYMENT_TABLE_ID",
        "SYNCD_PAYMENT_SECRET",
    ];

    fn set_store_vars() {
        std::env::set_var("SYNCD_STORE_APP_ID", "cli_app");
        std::env::set_var("SYNCD_STORE_APP_SECRET", "s3cret");
        std::env::set_var("SYNCD_STORE_APP_TOKEN", "bascn_token");
    }

    fn clear_optional_vars() {
        for var in OPTIONAL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        set_store_vars();
        clear_optional_vars();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.mutation_delay_ms, 2000);
        assert_eq!(config.sync_page_size, 20);
        assert_eq!(config.store().app_id, "cli_app");
        assert!(config.meeting_settings().is_none());
        assert!(config.chat_settings().is_none());
        assert!(config.payment_settings().is_none());
    }

    #[test]
    fn test_vendor_settings_require_every_variable() {
        let _lock = TEST_LOCK.lock().unwrap();
        set_store_vars();
        clear_optional_vars();

        std::env::set_var("SYNCD_MEETING_TABLE_ID", "tblRec");
        std::env::set_var("SYNCD_MEETING_CALLBACK_TOKEN", "cb-token");
        std::env::set_var("SYNCD_MEETING_AES_KEY", "a-key");
        std::env::set_var("SYNCD_MEETING_APP_ID", "app-1");
        // secret_id and secret_key left unset

        let config = ServiceConfig::from_env().unwrap();
        assert!(config.meeting_settings().is_none());

        std::env::set_var("SYNCD_MEETING_SECRET_ID", "sid");
        std::env::set_var("SYNCD_MEETING_SECRET_KEY", "skey");
        let config = ServiceConfig::from_env().unwrap();
        let meeting = config.meeting_settings().unwrap();
        assert_eq!(meeting.table_id, "tblRec");
        assert_eq!(meeting.api.secret_id, "sid");
        assert_eq!(meeting.api.sdk_id, None);
        assert_eq!(meeting.api.base_url, "https://api.meeting.qq.com");

        clear_optional_vars();
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        set_store_vars();
        clear_optional_vars();

        std::env::set_var("SYNCD_LOG_LEVEL", "debug");
        std::env::set_var("SYNCD_MUTATION_DELAY_MS", "500");
        std::env::set_var("SYNCD_PAYMENT_TABLE_ID", "tblPay");
        std::env::set_var("SYNCD_PAYMENT_SECRET", "whsec_x");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.mutation_delay_ms, 500);
        let payment = config.payment_settings().unwrap();
        assert_eq!(payment.table_id, "tblPay");
        assert_eq!(payment.secret, "whsec_x");

        clear_optional_vars();
    }
}
