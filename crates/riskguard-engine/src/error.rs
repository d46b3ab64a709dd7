//! Error types for riskguard-engine.
//!
//! Every variant is transient from the control loop's point of view: a
//! failed call is logged and retried on the next tick, never fatal (the
//! sole exception is the startup probe, which the daemon escalates itself).

use thiserror::Error;

/// Trading-engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine HTTP error: {0}")]
    Http(String),

    #[error("Engine response parse error: {0}")]
    Parse(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
