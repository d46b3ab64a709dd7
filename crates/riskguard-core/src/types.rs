//! Account snapshot and calendar data types.
//!
//! An `AccountSnapshot` is an immutable point-in-time view produced fresh on
//! every tick by the trading-engine collaborator; nothing in the core ever
//! mutates one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier of an open position (the engine's ticket number).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl Ticket {
    /// Create a ticket from a raw engine identifier.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine identifier.
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Buy,
    Sell,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// An open position, externally owned and read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Engine ticket number.
    pub ticket: Ticket,
    /// Instrument symbol (e.g. "EURUSD", "XAUUSD.m").
    pub symbol: String,
    /// Position direction.
    pub side: PositionSide,
    /// Lot volume. Decimal so the value round-trips exactly into a close
    /// request.
    pub volume: Decimal,
    /// Open timestamp (UTC).
    pub open_time: DateTime<Utc>,
}

impl Position {
    /// Seconds elapsed since the position was opened.
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.open_time).num_seconds()
    }
}

/// Immutable point-in-time view of account exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Total aggregate risk as a percentage, pre-computed by the engine.
    pub total_risk_pct: f64,
    /// All currently open positions.
    pub positions: Vec<Position>,
}

impl AccountSnapshot {
    /// Set of open ticket identifiers in this snapshot.
    #[must_use]
    pub fn ticket_set(&self) -> BTreeSet<Ticket> {
        self.positions.iter().map(|p| p.ticket).collect()
    }

    /// Number of open positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

/// A scheduled event from the calendar collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Tagged currency (e.g. "USD").
    pub currency: String,
    /// Event timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Human-readable event label.
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn position(ticket: u64, symbol: &str) -> Position {
        Position {
            ticket: Ticket::new(ticket),
            symbol: symbol.to_string(),
            side: PositionSide::Buy,
            volume: dec!(0.10),
            open_time: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_ticket_display() {
        assert_eq!(Ticket::new(12345).to_string(), "#12345");
    }

    #[test]
    fn test_ticket_set_deduplicates_and_orders() {
        let snapshot = AccountSnapshot {
            total_risk_pct: 1.0,
            positions: vec![position(30, "EURUSD"), position(10, "GBPUSD"), position(30, "EURUSD")],
        };
        let tickets: Vec<_> = snapshot.ticket_set().into_iter().collect();
        assert_eq!(tickets, vec![Ticket::new(10), Ticket::new(30)]);
    }

    #[test]
    fn test_position_age_seconds() {
        let pos = position(1, "EURUSD");
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 45).unwrap();
        assert_eq!(pos.age_seconds(now), 45);
    }

    #[test]
    fn test_position_side_serde_lowercase() {
        assert_eq!(serde_json::to_string(&PositionSide::Buy).unwrap(), "\"buy\"");
        let side: PositionSide = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(side, PositionSide::Sell);
    }

    #[test]
    fn test_snapshot_round_trips_volume_exactly() {
        let snapshot = AccountSnapshot {
            total_risk_pct: 3.5,
            positions: vec![position(7, "USDJPY")],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: AccountSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.positions[0].volume, dec!(0.10));
    }
}
