mod artifact;
mod chat;
mod config;
mod meeting;

pub use artifact::HttpArtifactFetcher;
pub use chat::ChatClient;
pub use config::{ChatApiConfig, MeetingApiConfig};
pub use meeting::MeetingClient;
