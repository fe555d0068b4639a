mod auth;
mod domain;

pub use auth::*;
pub use domain::*;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockArtifactFetcher;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockGroupChatSource;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockRecordingSource;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockTableStore;
