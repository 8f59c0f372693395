//! A dedicated error for everything that can go wrong: I/O, DNS wire
//! inconsistencies, validation, and the HTTP probes.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("malformed dns response: {0}")]
    DnsMalformed(String),

    #[error("dns transaction id mismatch")]
    DnsTransactionMismatch,

    #[error("dns error response (rcode={0})")]
    DnsRcode(u8),

    #[error("operation timed out")]
    Timeout,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type ScoutResult<T> = Result<T, ScoutError>;

impl ScoutError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        ScoutError::Validation(msg.into())
    }

    /// Whether this error, surfaced during a single resolve attempt, is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScoutError::Timeout)
    }
}
