use thiserror::Error;

/// Failure taxonomy for every core operation.
///
/// None of these are retried internally; retries, if any, belong to the
/// caller. Storage failures during a multi-row atomic unit abort the whole
/// unit (the transaction rolls back) and surface as [`Error::Internal`].
#[derive(Debug, Error)]
pub enum Error {
    /// The supplied teacher key does not match the configured secret.
    #[error("unauthorized: teacher key mismatch")]
    Unauthorized,

    /// No session or candidate matches the given code/id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation requires a session state the session is not in,
    /// e.g. voting on or closing an already-CLOSED session.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A required field is missing or malformed, e.g. an empty session
    /// code list for a summary report.
    #[error("validation: {0}")]
    Validation(String),

    /// The storage layer failed; surfaced, never suppressed.
    #[error("storage error: {0}")]
    Internal(#[from] sea_orm::DbErr),

    /// Serializing a backup payload failed.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The report renderer failed. A close that already committed is not
    /// rolled back by this; the report stays regeneratable from stored votes.
    #[error("report rendering error: {0}")]
    Render(#[from] printpdf::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
