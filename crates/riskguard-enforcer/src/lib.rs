//! Risk-enforcement state machine for the riskguard daemon.
//!
//! Two per-tick decision procedures share one timed suspension primitive:
//!
//! - [`AggregateRiskEnforcer`]: closes positions opened beyond the tolerated
//!   baseline while aggregate risk exceeds the threshold, escalating to a
//!   timed trading suspension after enough violations.
//! - [`EventWindowEnforcer`]: closes freshly-opened positions caught inside
//!   a scheduled-event window and arms the same suspension once per batch.
//! - [`KillSwitch`]: the suspension primitive itself: monotonic
//!   arm-until, query, and exactly-once re-enable on expiry.
//!
//! Both enforcers persist through `riskguard-state` and talk to the engine
//! through the `riskguard-engine` seam; neither owns a clock (the control
//! loop passes `now` in, which keeps every decision testable).

pub mod aggregate;
pub mod error;
pub mod kill_switch;
pub mod news;

pub use aggregate::{
    AggregateRiskConfig, AggregateRiskEnforcer, RiskBlockStatus, AGGREGATE_CLOSE_COMMENT,
    RISK_EPSILON,
};
pub use error::{EnforcerError, EnforcerResult};
pub use kill_switch::{KillSwitch, KillSwitchStatus};
pub use news::{
    events_in_window, AutotradePolicy, EventWindowConfig, EventWindowEnforcer,
    NEWS_CLOSE_COMMENT,
};
