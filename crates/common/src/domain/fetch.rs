use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Fetches the text body behind an artifact download address
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> DomainResult<String>;
}
