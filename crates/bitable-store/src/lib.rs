mod client;
mod config;
mod models;
mod store;

pub use client::BitableClient;
pub use config::BitableConfig;
pub use store::BitableStore;
