mod group_chat_service;
mod mutation_queue;
mod payment_service;
mod recording_event_service;
mod recording_sync_service;

pub use group_chat_service::*;
pub use mutation_queue::*;
pub use payment_service::*;
pub use recording_event_service::*;
pub use recording_sync_service::*;
