//! Scheduled-event calendar for the riskguard daemon.
//!
//! Events come from an external feed on a slow cadence (weekly in
//! practice) and are cached locally as JSON; ticks read the cache, never
//! the network. A stale or unreadable cache is treated as "no calendar"
//! and the event-window enforcer simply has nothing to match.

pub mod cache;
pub mod client;
pub mod error;

pub use cache::CalendarCache;
pub use client::CalendarClient;
pub use error::{CalendarError, CalendarResult};
