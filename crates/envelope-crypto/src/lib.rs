//! Vendor webhook envelope verification and decryption.
//!
//! Pure codecs: no network, no clock reads. Timestamps are inputs so callers
//! (and tests) control them.

pub mod chat;
mod error;
pub mod meeting;
pub mod payment;
mod signature;

pub use chat::{ChatCrypto, ChatEnvelope};
pub use error::{Result, VerifyError};
pub use meeting::{MeetingCrypto, SealedPayload};
pub use payment::verify_payment_signature;
