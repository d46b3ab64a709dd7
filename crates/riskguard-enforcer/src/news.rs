//! Scheduled-event window enforcement.
//!
//! Positions opened moments before or during a matching calendar event are
//! treated as news reactions and closed unconditionally, independent of
//! aggregate risk. The kill switch is armed once per batch, after every
//! affected position has been attempted, to the latest matched event time
//! plus the window, so a burst of simultaneous events yields one
//! suspension, not overlapping partial ones.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use riskguard_core::{
    AccountSnapshot, AffectedPosition, CalendarEvent, ClosedTicket, CurrencyMapper,
    EventWindowReport,
};
use riskguard_engine::{CloseRequest, DynTradingEngine};

use crate::error::EnforcerResult;
use crate::kill_switch::KillSwitch;

/// Engine-visible comment on event-window closes.
pub const NEWS_CLOSE_COMMENT: &str = "riskguard news-window";

/// Whether the enforcer toggles automated trading while closing.
///
/// Closing an existing position may itself require automated execution to
/// be enabled, but the enable call is a side effect with its own failure
/// mode, so the choice is explicit configuration rather than two
/// implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutotradePolicy {
    /// Assume automated trading is already enabled; never touch the flag
    /// mid-enforcement.
    #[default]
    AssumeEnabled,
    /// Force the flag on immediately before each close attempt; the control
    /// loop turns it back off once the closures are confirmed.
    ForceEnable,
}

/// Event-window enforcement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventWindowConfig {
    /// Half-width of the event window in minutes (events within ±window of
    /// now match).
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// Only positions opened within this many seconds count as news
    /// reactions. Defaults to `window_minutes * 60` when unset.
    #[serde(default)]
    pub recent_seconds: Option<u64>,
    /// Automated-trading toggling policy during closes.
    #[serde(default)]
    pub autotrade_policy: AutotradePolicy,
}

fn default_window_minutes() -> u32 {
    60
}

impl Default for EventWindowConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            recent_seconds: None,
            autotrade_policy: AutotradePolicy::default(),
        }
    }
}

impl EventWindowConfig {
    /// Effective recency cutoff in seconds.
    #[must_use]
    pub fn effective_recent_seconds(&self) -> i64 {
        self.recent_seconds
            .map_or(i64::from(self.window_minutes) * 60, |s| s as i64)
    }
}

/// Calendar events within ±`window_minutes` of `now` whose currency
/// intersects `currencies`.
#[must_use]
pub fn events_in_window(
    events: &[CalendarEvent],
    currencies: &BTreeSet<String>,
    now: DateTime<Utc>,
    window_minutes: u32,
) -> Vec<CalendarEvent> {
    let half = Duration::minutes(i64::from(window_minutes));
    let lo = now - half;
    let hi = now + half;
    events
        .iter()
        .filter(|e| currencies.contains(&e.currency) && e.timestamp >= lo && e.timestamp <= hi)
        .cloned()
        .collect()
}

/// Per-tick event-window enforcer.
///
/// Persists nothing of its own beyond the shared kill switch.
pub struct EventWindowEnforcer {
    engine: DynTradingEngine,
    kill_switch: Arc<KillSwitch>,
    mapper: Arc<dyn CurrencyMapper>,
    config: EventWindowConfig,
}

impl EventWindowEnforcer {
    /// Create an enforcer.
    pub fn new(
        engine: DynTradingEngine,
        kill_switch: Arc<KillSwitch>,
        mapper: Arc<dyn CurrencyMapper>,
        config: EventWindowConfig,
    ) -> Self {
        Self {
            engine,
            kill_switch,
            mapper,
            config,
        }
    }

    /// Run one event-window tick against a fresh snapshot and the cached
    /// calendar.
    pub async fn enforce_window(
        &self,
        snapshot: &AccountSnapshot,
        events: &[CalendarEvent],
        now: DateTime<Utc>,
    ) -> EnforcerResult<EventWindowReport> {
        let mut report = EventWindowReport::default();
        if events.is_empty() {
            return Ok(report);
        }

        let recent_seconds = self.config.effective_recent_seconds();
        let mut max_event_ts: Option<DateTime<Utc>> = None;

        for position in &snapshot.positions {
            // Only freshly-opened exposure counts as a news reaction.
            if position.age_seconds(now) > recent_seconds {
                continue;
            }

            let currencies = self.mapper.currencies(&position.symbol);
            let matches = events_in_window(events, &currencies, now, self.config.window_minutes);
            if matches.is_empty() {
                continue;
            }

            info!(
                ticket = %position.ticket,
                symbol = %position.symbol,
                events = matches.len(),
                "Position inside event window"
            );

            if self.config.autotrade_policy == AutotradePolicy::ForceEnable {
                // The close below is attempted regardless of how this goes.
                match self.engine.set_automated_trading(true).await {
                    Ok(true) => debug!("Automated trading forced on for close"),
                    Ok(false) => warn!("Engine refused to enable automated trading before close"),
                    Err(e) => warn!(?e, "Enable call failed before close"),
                }
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
                comment: NEWS_CLOSE_COMMENT.to_string(),
            };
            match self.engine.close_position(request).await {
                Ok(outcome) if outcome.accepted => {
                    info!(ticket = %position.ticket, "Event-window close accepted");
                    report.closed.push(ClosedTicket {
                        detail: outcome.detail,
                        ..entry
                    });
                }
                Ok(outcome) => {
                    warn!(ticket = %position.ticket, detail = %outcome.detail, "Event-window close rejected");
                    report.failed.push(ClosedTicket {
                        detail: outcome.detail,
                        ..entry
                    });
                }
                Err(e) => {
                    warn!(ticket = %position.ticket, ?e, "Event-window close call failed");
                    report.failed.push(ClosedTicket {
                        detail: e.to_string(),
                        ..entry
                    });
                }
            }

            let batch_max = matches
                .iter()
                .map(|m| m.timestamp)
                .max()
                .expect("matches is non-empty");
            max_event_ts = Some(max_event_ts.map_or(batch_max, |m| m.max(batch_max)));

            report.affected.push(AffectedPosition {
                ticket: position.ticket,
                symbol: position.symbol.clone(),
                events: matches,
            });
        }

        // Arm only after every affected position was attempted: one combined
        // suspension per batch, never mid-batch.
        if let Some(ts) = max_event_ts {
            let until = ts + Duration::minutes(i64::from(self.config.window_minutes));
            let effective = self.kill_switch.arm_until(until)?;
            report.kill_switch_until = Some(effective);
        }

        Ok(report)
    }
}
