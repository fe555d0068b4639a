use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingApiConfig {
    pub base_url: String,
    pub app_id: String,
    #[serde(default)]
    pub sdk_id: Option<String>,
    pub secret_id: String,
    pub secret_key: String,
}

impl Default for MeetingApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.meeting.qq.com".to_string(),
            app_id: "".to_string(),
            sdk_id: None,
            secret_id: "".to_string(),
            secret_key: "".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatApiConfig {
    pub base_url: String,
    pub corp_id: String,
    pub chat_secret: String,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://qyapi.weixin.qq.com".to_string(),
            corp_id: "".to_string(),
            chat_secret: "".to_string(),
        }
    }
}
