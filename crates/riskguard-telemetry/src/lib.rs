//! Logging and enforcement statistics for the riskguard daemon.

pub mod error;
pub mod logging;
pub mod stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use stats::EnforcementStats;
