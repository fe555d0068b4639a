mod diff;
mod event;
mod field;
mod fetch;
mod resolver;
mod result;
mod source;
mod store;

pub use diff::*;
pub use event::*;
pub use field::*;
pub use fetch::*;
pub use resolver::*;
pub use result::*;
pub use source::*;
pub use store::*;
