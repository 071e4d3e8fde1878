use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpcError {
    /// Empty or malformed series handed to the statistics layer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate scrap reason label: {0}")]
    DuplicateReason(String),

    #[error("invalid line profile for {line}: {reason}")]
    InvalidProfile { line: String, reason: String },
}

pub type SpcResult<T> = Result<T, SpcError>;
