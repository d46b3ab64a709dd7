//! Error types for riskguard-state.

use thiserror::Error;

/// State persistence errors.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for state operations.
pub type StateResult<T> = std::result::Result<T, StateError>;
