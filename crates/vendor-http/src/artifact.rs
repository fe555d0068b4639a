use async_trait::async_trait;
use common::{ArtifactFetcher, DomainError, DomainResult};
use tracing::instrument;

/// Plain HTTP fetcher for artifact download addresses
pub struct HttpArtifactFetcher {
    http: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    #[instrument(skip(self, url))]
    async fn fetch_text(&self, url: &str) -> DomainResult<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::SourceError(format!("artifact fetch: {e}")))?;
        if !response.status().is_success() {
            return Err(DomainError::SourceError(format!(
                "artifact fetch returned {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| DomainError::SourceError(format!("artifact body: {e}")))
    }
}
