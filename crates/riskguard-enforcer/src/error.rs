//! Error types for riskguard-enforcer.
//!
//! Engine failures never surface here: a failed close is recorded in the
//! report and a failed re-enable is logged. Only state persistence can
//! make an enforcement tick fail.

use thiserror::Error;

/// Enforcement errors.
#[derive(Debug, Error)]
pub enum EnforcerError {
    #[error("Enforcement state error: {0}")]
    State(#[from] riskguard_state::StateError),
}

/// Result type alias for enforcement operations.
pub type EnforcerResult<T> = std::result::Result<T, EnforcerError>;
