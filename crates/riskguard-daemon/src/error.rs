//! Error types for riskguard-daemon.

use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// First engine contact failed; enforcement is impossible without it.
    #[error("Startup failed: {0}")]
    Startup(String),

    #[error(transparent)]
    Engine(#[from] riskguard_engine::EngineError),

    #[error(transparent)]
    Enforcer(#[from] riskguard_enforcer::EnforcerError),

    #[error(transparent)]
    Calendar(#[from] riskguard_calendar::CalendarError),

    #[error(transparent)]
    Notify(#[from] riskguard_notify::NotifyError),

    #[error(transparent)]
    Telemetry(#[from] riskguard_telemetry::TelemetryError),
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
