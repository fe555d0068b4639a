use thiserror::Error;

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors for webhook ingestion and store reconciliation
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unrecognized field shape: {0}")]
    UnrecognizedFieldShape(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(#[from] anyhow::Error),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Vendor API error {code}: {message}")]
    VendorApi { code: i64, message: String },

    #[error("Mutation queue closed")]
    QueueClosed,
}
