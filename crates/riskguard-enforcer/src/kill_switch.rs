//! Timed trading-suspension primitive.
//!
//! The switch owns a single persisted value: the instant until which
//! automated trading must stay disabled. Arming only ever extends it
//! (both enforcement paths may arm within one tick and the switch must
//! converge to the latest required suspension, never shorten it), and the
//! expiry edge re-enables the engine exactly once.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use riskguard_engine::TradingEngine;
use riskguard_state::{FileStore, KillSwitchState};

use crate::error::EnforcerResult;

/// Point-in-time view of the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillSwitchStatus {
    /// True iff a suspension expiry is set and still in the future.
    pub active: bool,
    /// The suspension expiry, if any.
    pub until: Option<DateTime<Utc>>,
}

/// Timed kill switch over a persisted expiry.
#[derive(Debug)]
pub struct KillSwitch {
    store: FileStore<KillSwitchState>,
}

impl KillSwitch {
    /// Create a switch over its persisted record.
    pub fn new(store: FileStore<KillSwitchState>) -> Self {
        Self { store }
    }

    /// Current status. Active means `until` is strictly in the future.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> KillSwitchStatus {
        let state = self.store.load();
        KillSwitchStatus {
            active: state.until.is_some_and(|until| until > now),
            until: state.until,
        }
    }

    /// Arm the switch until `until`, keeping the later of the current and
    /// requested expiries. Arming with an earlier or equal timestamp is a
    /// no-op. Returns the effective expiry.
    pub fn arm_until(&self, until: DateTime<Utc>) -> EnforcerResult<DateTime<Utc>> {
        let state = self.store.load();
        match state.until {
            Some(current) if current >= until => {
                debug!(current = %current, requested = %until, "Kill switch already armed later");
                Ok(current)
            }
            _ => {
                self.store.save(&KillSwitchState { until: Some(until) })?;
                info!(until = %until, "Kill switch armed");
                Ok(until)
            }
        }
    }

    /// Re-enable automated trading if the suspension has expired.
    ///
    /// Clears the persisted expiry before issuing the enable, so the edge
    /// fires exactly once per expiry: a second call finds no expiry and is
    /// a no-op. An enable failure is logged for the operator; the engine
    /// call is not retried through this path.
    pub async fn maybe_reenable(
        &self,
        engine: &dyn TradingEngine,
        now: DateTime<Utc>,
    ) -> EnforcerResult<bool> {
        let state = self.store.load();
        let Some(until) = state.until else {
            return Ok(false);
        };
        if now < until {
            return Ok(false);
        }

        self.store.save(&KillSwitchState { until: None })?;

        match engine.set_automated_trading(true).await {
            Ok(true) => info!(expired = %until, "Suspension expired, automated trading re-enabled"),
            Ok(false) => error!(expired = %until, "Engine refused to re-enable automated trading"),
            Err(e) => error!(expired = %until, ?e, "Re-enable call failed"),
        }

        Ok(true)
    }
}
