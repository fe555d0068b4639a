use crate::config::ChatApiConfig;
use async_trait::async_trait;
use common::{DomainError, DomainResult, GroupChat, GroupChatSource, GroupChatSummary, TokenCache};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

// Vendor codes for an access token that expired or was revoked early
const TOKEN_EXPIRED_CODES: &[i64] = &[40014, 42001];
const LIST_LIMIT: u32 = 100;

/// Which corp secret a token was minted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Chat,
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct GroupChatRef {
    chat_id: String,
    #[serde(default)]
    status: i64,
}

#[derive(Debug, Deserialize)]
struct GroupChatListDto {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    group_chat_list: Vec<GroupChatRef>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct MemberRef {}

#[derive(Debug, Deserialize)]
struct GroupChatDetailDto {
    chat_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    create_time: i64,
    #[serde(default)]
    notice: String,
    #[serde(default)]
    member_list: Vec<MemberRef>,
    #[serde(default)]
    admin_list: Vec<MemberRef>,
    #[serde(default)]
    member_version: String,
}

#[derive(Debug, Deserialize)]
struct GroupChatGetDto {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    group_chat: Option<GroupChatDetailDto>,
}

/// Chat vendor API client with per-credential token caching
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatApiConfig,
    tokens: TokenCache<CredentialKind>,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, config: ChatApiConfig) -> Self {
        Self { http, config, tokens: TokenCache::new() }
    }

    async fn access_token(&self, kind: CredentialKind) -> DomainResult<String> {
        if let Some(token) = self.tokens.get(&kind) {
            return Ok(token);
        }

        debug!(?kind, "fetching chat access token");
        let url = format!(
            "{}/cgi-bin/gettoken?corpid={}&corpsecret={}",
            self.config.base_url, self.config.corp_id, self.config.chat_secret
        );
        let dto: TokenDto = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::SourceError(format!("token request: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::SourceError(format!("token decode: {e}")))?;

        if dto.errcode != 0 {
            return Err(DomainError::VendorApi { code: dto.errcode, message: dto.errmsg });
        }
        self.tokens.put(kind, dto.access_token.clone(), dto.expires_in);
        Ok(dto.access_token)
    }

    /// Drop the cached token when the vendor says it expired early
    fn check_errcode(&self, kind: CredentialKind, errcode: i64, errmsg: &str) -> DomainResult<()> {
        if errcode == 0 {
            return Ok(());
        }
        if TOKEN_EXPIRED_CODES.contains(&errcode) {
            warn!(errcode, "chat access token rejected, invalidating cache");
            self.tokens.invalidate(&kind);
        }
        Err(DomainError::VendorApi { code: errcode, message: errmsg.to_string() })
    }
}

#[async_trait]
impl GroupChatSource for ChatClient {
    #[instrument(skip(self))]
    async fn list_group_chats(&self) -> DomainResult<Vec<GroupChatSummary>> {
        let mut chats = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let token = self.access_token(CredentialKind::Chat).await?;
            let url = format!(
                "{}/cgi-bin/externalcontact/groupchat/list?access_token={token}",
                self.config.base_url
            );
            let mut body = json!({ "status_filter": 0, "limit": LIST_LIMIT });
            if let Some(cursor) = &cursor {
                body["cursor"] = json!(cursor);
            }

            let dto: GroupChatListDto = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| DomainError::SourceError(format!("groupchat list: {e}")))?
                .json()
                .await
                .map_err(|e| DomainError::SourceError(format!("groupchat list decode: {e}")))?;
            self.check_errcode(CredentialKind::Chat, dto.errcode, &dto.errmsg)?;

            chats.extend(dto.group_chat_list.into_iter().map(|r| GroupChatSummary {
                chat_id: r.chat_id,
                status: r.status,
            }));

            match dto.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(total = chats.len(), "listed group chats");
        Ok(chats)
    }

    #[instrument(skip(self))]
    async fn get_group_chat(&self, chat_id: &str) -> DomainResult<GroupChat> {
        let token = self.access_token(CredentialKind::Chat).await?;
        let url = format!(
            "{}/cgi-bin/externalcontact/groupchat/get?access_token={token}",
            self.config.base_url
        );
        let dto: GroupChatGetDto = self
            .http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "need_name": 1 }))
            .send()
            .await
            .map_err(|e| DomainError::SourceError(format!("groupchat get: {e}")))?
            .json()
            .await
            .map_err(|e| DomainError::SourceError(format!("groupchat get decode: {e}")))?;
        self.check_errcode(CredentialKind::Chat, dto.errcode, &dto.errmsg)?;

        let detail = dto
            .group_chat
            .ok_or_else(|| DomainError::SourceError(format!("group chat {chat_id} missing detail")))?;
        Ok(GroupChat {
            chat_id: detail.chat_id,
            name: detail.name,
            owner: detail.owner,
            create_time: detail.create_time,
            notice: detail.notice,
            member_count: detail.member_list.len(),
            admin_count: detail.admin_list.len(),
            member_version: detail.member_version,
        })
    }
}
