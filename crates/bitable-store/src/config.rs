use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitableConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    /// The bitable app the tables live in
    pub app_token: String,
}

impl Default for BitableConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.feishu.cn".to_string(),
            app_id: "".to_string(),
            app_secret: "".to_string(),
            app_token: "".to_string(),
        }
    }
}
