//! Error types for riskguard-calendar.

use thiserror::Error;

/// Calendar errors.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Calendar cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calendar serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Calendar feed HTTP error: {0}")]
    Http(String),

    #[error("Calendar feed parse error: {0}")]
    Parse(String),
}

/// Result type alias for calendar operations.
pub type CalendarResult<T> = std::result::Result<T, CalendarError>;
