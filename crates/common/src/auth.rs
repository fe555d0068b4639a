mod token_cache;

pub use token_cache::*;
