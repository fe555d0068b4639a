use crate::config::BitableConfig;
use anyhow::{bail, Context};
use common::TokenCache;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

// Vendor codes meaning the tenant token expired before its advertised TTL
const AUTH_EXPIRED_CODES: &[i64] = &[99991661, 99991663, 99991668];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TokenKind {
    Tenant,
}

#[derive(Debug, Deserialize)]
struct TenantTokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// Authenticated HTTP client for the tabular store's open API.
///
/// Tenant access tokens are cached with an early-expiry skew and dropped
/// when the API reports an auth-expired code, so the next call refreshes.
pub struct BitableClient {
    http: reqwest::Client,
    config: BitableConfig,
    tokens: TokenCache<TokenKind>,
}

impl BitableClient {
    pub fn new(http: reqwest::Client, config: BitableConfig) -> Self {
        Self { http, config, tokens: TokenCache::new() }
    }

    pub fn app_token(&self) -> &str {
        &self.config.app_token
    }

    async fn tenant_token(&self) -> anyhow::Result<String> {
        if let Some(token) = self.tokens.get(&TokenKind::Tenant) {
            return Ok(token);
        }

        debug!("fetching tenant access token");
        let url = format!("{}/open-apis/auth/v3/tenant_access_token/internal", self.config.base_url);
        let response: TenantTokenResponse = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await
            .context("tenant token request failed")?
            .json()
            .await
            .context("tenant token response was not JSON")?;

        if response.code != 0 {
            bail!("tenant token error {}: {}", response.code, response.msg);
        }
        self.tokens
            .put(TokenKind::Tenant, response.tenant_access_token.clone(), response.expire);
        Ok(response.tenant_access_token)
    }

    /// GET with query parameters, returning the response `data`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let token = self.tenant_token().await?;
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        self.unwrap_data(path, response).await
    }

    /// POST a JSON body, returning the response `data`
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> anyhow::Result<T> {
        let token = self.tenant_token().await?;
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        self.unwrap_data(path, response).await
    }

    /// PUT a JSON body, returning the response `data`
    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> anyhow::Result<T> {
        let token = self.tenant_token().await?;
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("PUT {path} failed"))?;
        self.unwrap_data(path, response).await
    }

    async fn unwrap_data<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> anyhow::Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("{path} returned non-JSON (status {status})"))?;

        if body.code != 0 {
            if AUTH_EXPIRED_CODES.contains(&body.code) {
                warn!(code = body.code, "tenant token rejected, invalidating cache");
                self.tokens.invalidate(&TokenKind::Tenant);
            }
            bail!("store API error {} on {path}: {}", body.code, body.msg);
        }
        body.data
            .with_context(|| format!("{path} returned code 0 without data"))
    }
}
