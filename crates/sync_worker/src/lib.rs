pub mod domain;
pub mod webhook;

pub use domain::*;
pub use webhook::*;
