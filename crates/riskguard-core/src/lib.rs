//! Core domain types for the riskguard daemon.
//!
//! This crate provides the types shared by every other riskguard crate:
//! - `Ticket`: unique identifier of an open position
//! - `Position`, `AccountSnapshot`: point-in-time view of account exposure
//! - `CalendarEvent`: a time-stamped, currency-tagged scheduled event
//! - `AggregateReport`, `EventWindowReport`: per-tick enforcement reports
//! - `CurrencyMapper`: symbol-to-currency derivation seam

pub mod currency;
pub mod report;
pub mod types;

pub use currency::{CurrencyMapper, PairSplitMapper};
pub use report::{AffectedPosition, AggregateReport, ClosedTicket, EventWindowReport};
pub use types::{AccountSnapshot, CalendarEvent, Position, PositionSide, Ticket};
