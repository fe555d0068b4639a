use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("receiver mismatch: expected {expected}, got {actual}")]
    ReceiverMismatch { expected: String, actual: String },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, VerifyError>;
