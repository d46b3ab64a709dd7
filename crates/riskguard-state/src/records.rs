//! Persisted record types.
//!
//! Every field tolerates absence in the backing file; documented defaults
//! stand in for missing keys. There is no schema versioning beyond that.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use riskguard_core::Ticket;
use serde::{Deserialize, Serialize};

/// State owned exclusively by the aggregate risk enforcer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementState {
    /// Tickets considered pre-existing/tolerated as of the last in-threshold
    /// tick. Never contains a ticket the enforcer itself closed as a
    /// violation.
    pub baseline_tickets: BTreeSet<Ticket>,
    /// Consecutive new-ticket violations since the last reset.
    pub block_attempts: u32,
    /// Timestamp of the most recent violation.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// True once attempts reached the configured maximum or the kill switch
    /// was observed active.
    pub risk_block_active: bool,
}

impl EnforcementState {
    /// First run for this account: no baseline has ever been captured.
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.baseline_tickets.is_empty()
    }
}

/// State owned exclusively by the kill switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KillSwitchState {
    /// Suspension expiry: automated trading stays disabled until this
    /// instant. Absent means the switch is disarmed.
    pub until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforcement_state_defaults() {
        let state = EnforcementState::default();
        assert!(state.is_first_run());
        assert_eq!(state.block_attempts, 0);
        assert!(state.last_attempt_at.is_none());
        assert!(!state.risk_block_active);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let state: EnforcementState = serde_json::from_str(r#"{"block_attempts": 2}"#).unwrap();
        assert_eq!(state.block_attempts, 2);
        assert!(state.baseline_tickets.is_empty());
        assert!(!state.risk_block_active);

        let switch: KillSwitchState = serde_json::from_str("{}").unwrap();
        assert!(switch.until.is_none());
    }

    #[test]
    fn test_first_run_cleared_by_baseline() {
        let mut state = EnforcementState::default();
        state.baseline_tickets.insert(Ticket::new(1));
        assert!(!state.is_first_run());
    }
}
