//! Error types for riskguard-notify.

use thiserror::Error;

/// Notification errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification HTTP error: {0}")]
    Http(String),
}

/// Result type alias for notification operations.
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
