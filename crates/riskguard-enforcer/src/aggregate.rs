//! Aggregate-risk enforcement.
//!
//! Per-tick decision procedure over the account's total risk percentage.
//! Positions open while risk is acceptable become the tolerated baseline;
//! once risk exceeds the threshold, every ticket beyond the baseline is a
//! violation: it is closed, counted, and after enough consecutive
//! violations the kill switch suspends automated trading for a block
//! window.

use std::cmp::max;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use riskguard_core::{AccountSnapshot, AggregateReport, ClosedTicket, Ticket};
use riskguard_engine::{CloseRequest, DynTradingEngine};
use riskguard_state::{EnforcementState, FileStore};

use crate::error::EnforcerResult;
use crate::kill_switch::{KillSwitch, KillSwitchStatus};

/// Tolerance for threshold comparisons, absorbing floating-point noise in
/// the engine-supplied percentage so the boundary cannot flap.
pub const RISK_EPSILON: f64 = 1e-9;

/// Engine-visible comment on aggregate-limit closes.
pub const AGGREGATE_CLOSE_COMMENT: &str = "riskguard agg-limit";

/// Aggregate-risk enforcement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRiskConfig {
    /// Maximum tolerated total risk percentage.
    #[serde(default = "default_threshold_pct")]
    pub threshold_pct: f64,
    /// Violations tolerated before the kill switch is armed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Suspension length, and the idle window after which stale attempts
    /// decay.
    #[serde(default = "default_block_minutes")]
    pub block_minutes: u32,
}

fn default_threshold_pct() -> f64 {
    5.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_block_minutes() -> u32 {
    60
}

impl Default for AggregateRiskConfig {
    fn default() -> Self {
        Self {
            threshold_pct: default_threshold_pct(),
            max_attempts: default_max_attempts(),
            block_minutes: default_block_minutes(),
        }
    }
}

/// Read-only view of the current block state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskBlockStatus {
    pub risk_block_active: bool,
    pub block_attempts: u32,
    pub baseline_tickets: Vec<Ticket>,
    pub kill_switch: KillSwitchStatus,
}

/// Per-tick aggregate-risk enforcer.
///
/// Owns the persisted `EnforcementState` exclusively; the control loop is
/// the only caller, one tick at a time.
pub struct AggregateRiskEnforcer {
    engine: DynTradingEngine,
    store: FileStore<EnforcementState>,
    kill_switch: Arc<KillSwitch>,
    config: AggregateRiskConfig,
}

impl AggregateRiskEnforcer {
    /// Create an enforcer over its persisted state.
    pub fn new(
        engine: DynTradingEngine,
        store: FileStore<EnforcementState>,
        kill_switch: Arc<KillSwitch>,
        config: AggregateRiskConfig,
    ) -> Self {
        Self {
            engine,
            store,
            kill_switch,
            config,
        }
    }

    /// Run one enforcement tick against a fresh snapshot.
    pub async fn enforce(
        &self,
        snapshot: &AccountSnapshot,
        now: DateTime<Utc>,
    ) -> EnforcerResult<AggregateReport> {
        let total = snapshot.total_risk_pct;
        let current_tickets = snapshot.ticket_set();

        let mut state = self.store.load();
        let ks_before = self.kill_switch.status(now);
        let mut risk_block_active = state.risk_block_active || ks_before.active;

        // Stale-violation decay: without it a transient spike would inflate
        // the counter indefinitely.
        if state.block_attempts > 0 {
            if let Some(last) = state.last_attempt_at {
                let idle = now - last;
                if idle >= Duration::minutes(i64::from(max(1, self.config.block_minutes))) {
                    debug!(
                        attempts = state.block_attempts,
                        idle_minutes = idle.num_minutes(),
                        "Violation attempts decayed after idle window"
                    );
                    state.block_attempts = 0;
                    state.last_attempt_at = None;
                }
            }
        }

        let mut report = AggregateReport {
            now,
            threshold_pct: self.config.threshold_pct,
            total_risk_pct: total,
            positions: snapshot.position_count(),
            baseline_tickets: state.baseline_tickets.iter().copied().collect(),
            new_tickets: Vec::new(),
            closed: Vec::new(),
            failed: Vec::new(),
            attempts_before: state.block_attempts,
            attempts_after: state.block_attempts,
            risk_block_before: risk_block_active,
            risk_block_after: risk_block_active,
            kill_switch_active_before: ks_before.active,
            kill_switch_active_after: ks_before.active,
            kill_switch_until_before: ks_before.until,
            kill_switch_until_after: ks_before.until,
            kill_switch_armed_now: false,
            block_minutes: self.config.block_minutes,
        };

        // First run for this account: capture the baseline and tolerate all
        // pre-existing exposure. Nothing is ever closed on this tick.
        if state.is_first_run() {
            state.baseline_tickets = current_tickets;
            state.risk_block_active = risk_block_active;
            self.store.save(&state)?;
            report.baseline_tickets = state.baseline_tickets.iter().copied().collect();
            info!(
                baseline = report.baseline_tickets.len(),
                total_risk_pct = total,
                "Baseline captured on first run"
            );
            return Ok(report);
        }

        // Risk within threshold: roll the baseline forward. Attempts are
        // left alone here unless a block cycle just finished (kill switch no
        // longer active), which gets a clean reset.
        if total <= self.config.threshold_pct + RISK_EPSILON {
            if risk_block_active && !ks_before.active {
                info!("Risk back in bounds and suspension expired, resetting block cycle");
                state.block_attempts = 0;
                state.last_attempt_at = None;
                risk_block_active = false;
            }
            state.baseline_tickets = current_tickets;
            state.risk_block_active = risk_block_active;
            self.store.save(&state)?;
            report.baseline_tickets = state.baseline_tickets.iter().copied().collect();
            report.attempts_after = state.block_attempts;
            report.risk_block_after = risk_block_active;
            return Ok(report);
        }

        // Risk exceeded: every ticket beyond the baseline is a violation.
        let new_tickets: Vec<Ticket> = current_tickets
            .difference(&state.baseline_tickets)
            .copied()
            .collect();
        report.new_tickets = new_tickets.clone();

        for position in &snapshot.positions {
            if !new_tickets.contains(&position.ticket) {
                continue;
            }
            let entry = ClosedTicket {
                ticket: position.ticket,
                symbol: position.symbol.clone(),
                detail: String::new(),
            };
            let request = CloseRequest {
                ticket: position.ticket,
                symbol: position.symbol.clone(),
                side: position.side,
                volume: position.volume,
                comment: AGGREGATE_CLOSE_COMMENT.to_string(),
            };
            // One failed close must not block the rest of the batch.
            match self.engine.close_position(request).await {
                Ok(outcome) if outcome.accepted => {
                    info!(ticket = %position.ticket, symbol = %position.symbol, "Violation closed");
                    report.closed.push(ClosedTicket {
                        detail: outcome.detail,
                        ..entry
                    });
                }
                Ok(outcome) => {
                    warn!(
                        ticket = %position.ticket,
                        detail = %outcome.detail,
                        "Close rejected by engine"
                    );
                    report.failed.push(ClosedTicket {
                        detail: outcome.detail,
                        ..entry
                    });
                }
                Err(e) => {
                    warn!(ticket = %position.ticket, ?e, "Close call failed");
                    report.failed.push(ClosedTicket {
                        detail: e.to_string(),
                        ..entry
                    });
                }
            }
        }

        // One attempt per violating ticket, not per tick.
        if !new_tickets.is_empty() {
            state.block_attempts += new_tickets.len() as u32;
            state.last_attempt_at = Some(now);
        }
        report.attempts_after = state.block_attempts;

        if state.block_attempts >= self.config.max_attempts {
            risk_block_active = true;
            if !ks_before.active {
                let until =
                    now + Duration::minutes(i64::from(max(1, self.config.block_minutes)));
                match self.kill_switch.arm_until(until) {
                    Ok(effective) => {
                        report.kill_switch_armed_now = true;
                        debug!(until = %effective, "Risk block escalated to suspension");
                    }
                    Err(e) => warn!(?e, "Failed to arm kill switch"),
                }
            }
        }

        let ks_after = self.kill_switch.status(now);
        report.kill_switch_active_after = ks_after.active;
        report.kill_switch_until_after = ks_after.until;
        // An active switch always reads as a risk block, whichever path
        // armed it.
        if ks_after.active {
            risk_block_active = true;
        }

        // The baseline keeps its pre-violation contents: closing is the
        // remedy, the new tickets must not become silently tolerated.
        state.risk_block_active = risk_block_active;
        self.store.save(&state)?;
        report.risk_block_after = risk_block_active;

        Ok(report)
    }

    /// Current block state, combining persisted state with live switch
    /// status.
    #[must_use]
    pub fn block_status(&self, now: DateTime<Utc>) -> RiskBlockStatus {
        let state = self.store.load();
        let kill_switch = self.kill_switch.status(now);
        RiskBlockStatus {
            risk_block_active: state.risk_block_active || kill_switch.active,
            block_attempts: state.block_attempts,
            baseline_tickets: state.baseline_tickets.iter().copied().collect(),
            kill_switch,
        }
    }
}
