mod chat_handler;
mod meeting_handler;
mod payment_handler;
mod request;

pub use chat_handler::*;
pub use meeting_handler::*;
pub use payment_handler::*;
pub use request::*;
