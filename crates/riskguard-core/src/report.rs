//! Per-tick enforcement reports.
//!
//! Reports are ephemeral: built by an enforcer during one tick, inspected by
//! the control loop, and handed unmodified to notification/logging sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CalendarEvent, Ticket};

/// Outcome of a single close attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTicket {
    pub ticket: Ticket,
    pub symbol: String,
    /// Engine-supplied detail (deal id, reject reason, transport error).
    pub detail: String,
}

/// Report produced by the aggregate risk enforcer, one per tick.
///
/// Carries the full before/after view so sinks never need to re-read state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Tick timestamp (UTC).
    pub now: DateTime<Utc>,
    pub threshold_pct: f64,
    pub total_risk_pct: f64,
    /// Open positions in the evaluated snapshot.
    pub positions: usize,
    /// Baseline (tolerated) tickets after this tick.
    pub baseline_tickets: Vec<Ticket>,
    /// Tickets that appeared beyond the baseline while risk was exceeded.
    pub new_tickets: Vec<Ticket>,
    pub closed: Vec<ClosedTicket>,
    pub failed: Vec<ClosedTicket>,
    pub attempts_before: u32,
    pub attempts_after: u32,
    pub risk_block_before: bool,
    pub risk_block_after: bool,
    pub kill_switch_active_before: bool,
    pub kill_switch_active_after: bool,
    pub kill_switch_until_before: Option<DateTime<Utc>>,
    pub kill_switch_until_after: Option<DateTime<Utc>>,
    /// True iff this tick armed the switch.
    pub kill_switch_armed_now: bool,
    pub block_minutes: u32,
}

impl AggregateReport {
    /// Whether this tick changed anything worth notifying about.
    ///
    /// Quiet ticks (risk in bounds, no transitions) produce a report that is
    /// logged at debug level and otherwise dropped.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.new_tickets.is_empty()
            || !self.closed.is_empty()
            || !self.failed.is_empty()
            || self.attempts_before != self.attempts_after
            || self.risk_block_before != self.risk_block_after
            || self.kill_switch_armed_now
    }
}

/// A position matched against one or more calendar events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedPosition {
    pub ticket: Ticket,
    pub symbol: String,
    /// Events that put this position inside the window.
    pub events: Vec<CalendarEvent>,
}

/// Report produced by the event-window enforcer, one per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventWindowReport {
    pub affected: Vec<AffectedPosition>,
    pub closed: Vec<ClosedTicket>,
    pub failed: Vec<ClosedTicket>,
    /// Combined suspension expiry armed for this batch, if any.
    pub kill_switch_until: Option<DateTime<Utc>>,
    /// Tickets still open when the confirmation barrier gave up.
    /// Filled by the control loop, empty unless a bounded wait expired.
    #[serde(default)]
    pub unconfirmed: Vec<Ticket>,
}

impl EventWindowReport {
    /// Whether any position fell inside an event window this tick.
    #[must_use]
    pub fn has_affected(&self) -> bool {
        !self.affected.is_empty()
    }

    /// Ticket identifiers of all affected positions.
    #[must_use]
    pub fn affected_tickets(&self) -> Vec<Ticket> {
        self.affected.iter().map(|a| a.ticket).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quiet_report() -> AggregateReport {
        AggregateReport {
            now: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
            threshold_pct: 5.0,
            total_risk_pct: 3.0,
            positions: 2,
            baseline_tickets: vec![Ticket::new(1), Ticket::new(2)],
            new_tickets: vec![],
            closed: vec![],
            failed: vec![],
            attempts_before: 0,
            attempts_after: 0,
            risk_block_before: false,
            risk_block_after: false,
            kill_switch_active_before: false,
            kill_switch_active_after: false,
            kill_switch_until_before: None,
            kill_switch_until_after: None,
            kill_switch_armed_now: false,
            block_minutes: 60,
        }
    }

    #[test]
    fn test_quiet_tick_has_no_changes() {
        assert!(!quiet_report().has_changes());
    }

    #[test]
    fn test_new_tickets_count_as_changes() {
        let mut report = quiet_report();
        report.new_tickets.push(Ticket::new(100));
        assert!(report.has_changes());
    }

    #[test]
    fn test_attempt_transition_counts_as_changes() {
        let mut report = quiet_report();
        report.attempts_after = 1;
        assert!(report.has_changes());
    }

    #[test]
    fn test_failed_close_counts_as_changes() {
        let mut report = quiet_report();
        report.failed.push(ClosedTicket {
            ticket: Ticket::new(100),
            symbol: "EURUSD".to_string(),
            detail: "requote".to_string(),
        });
        assert!(report.has_changes());
    }

    #[test]
    fn test_event_report_affected_tickets() {
        let report = EventWindowReport {
            affected: vec![AffectedPosition {
                ticket: Ticket::new(42),
                symbol: "EURUSD".to_string(),
                events: vec![],
            }],
            ..Default::default()
        };
        assert!(report.has_affected());
        assert_eq!(report.affected_tickets(), vec![Ticket::new(42)]);
    }

    #[test]
    fn test_event_report_unconfirmed_defaults_empty() {
        let json = r#"{"affected":[],"closed":[],"failed":[],"kill_switch_until":null}"#;
        let report: EventWindowReport = serde_json::from_str(json).unwrap();
        assert!(report.unconfirmed.is_empty());
    }
}
