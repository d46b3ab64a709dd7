//! The `TradingEngine` trait and its test double.
//!
//! The trait abstracts the three operations the core consumes, allowing
//! dependency injection for testing and alternative transports behind the
//! same seam.

use std::collections::{BTreeSet, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use riskguard_core::{AccountSnapshot, PositionSide, Ticket};

use crate::error::{EngineError, EngineResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Request to close an open position.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseRequest {
    pub ticket: Ticket,
    pub symbol: String,
    pub side: PositionSide,
    pub volume: Decimal,
    /// Engine-visible comment distinguishing the enforcement path.
    pub comment: String,
}

/// Engine verdict on a close request.
///
/// A rejected close (requote, ticket already gone, market closed) is a
/// normal outcome, not an error; only transport failures surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    pub accepted: bool,
    pub detail: String,
}

impl CloseOutcome {
    /// Successful close with engine detail.
    #[must_use]
    pub fn accepted(detail: impl Into<String>) -> Self {
        Self {
            accepted: true,
            detail: detail.into(),
        }
    }

    /// Rejected close with the engine's reason.
    #[must_use]
    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            accepted: false,
            detail: detail.into(),
        }
    }
}

/// The trading-engine collaborator.
///
/// All calls are bounded by the implementation's own timeout; callers treat
/// any `Err` as transient and retry on the next tick.
pub trait TradingEngine: Send + Sync {
    /// Fresh point-in-time view of account exposure and open positions.
    fn snapshot(&self) -> BoxFuture<'_, EngineResult<AccountSnapshot>>;

    /// Ask the engine to close one position.
    fn close_position(&self, request: CloseRequest) -> BoxFuture<'_, EngineResult<CloseOutcome>>;

    /// Enable or disable automated order submission. Returns the engine's
    /// acknowledgement.
    fn set_automated_trading(&self, enabled: bool) -> BoxFuture<'_, EngineResult<bool>>;
}

/// Arc wrapper for trait objects.
pub type DynTradingEngine = Arc<dyn TradingEngine>;

/// Scriptable trading engine for tests.
///
/// Snapshots are consumed from a queue; the final entry repeats so polling
/// loops observe a stable end state. Close behavior is scripted per ticket.
#[derive(Debug, Default)]
pub struct MockTradingEngine {
    snapshots: Mutex<VecDeque<AccountSnapshot>>,
    snapshot_calls: AtomicU64,
    snapshot_unavailable: AtomicBool,
    reject_tickets: Mutex<BTreeSet<Ticket>>,
    error_tickets: Mutex<BTreeSet<Ticket>>,
    closes: Mutex<Vec<CloseRequest>>,
    autotrade_calls: Mutex<Vec<bool>>,
    autotrade_ok: Mutex<bool>,
}

impl MockTradingEngine {
    /// Create a mock with no scripted snapshots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            autotrade_ok: Mutex::new(true),
            ..Self::default()
        }
    }

    /// Queue a snapshot. The last queued snapshot repeats indefinitely.
    pub fn push_snapshot(&self, snapshot: AccountSnapshot) {
        self.snapshots.lock().push_back(snapshot);
    }

    /// Make `snapshot()` fail until cleared.
    pub fn set_snapshot_unavailable(&self, unavailable: bool) {
        self.snapshot_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// Script a rejected close for `ticket`.
    pub fn reject_close(&self, ticket: Ticket) {
        self.reject_tickets.lock().insert(ticket);
    }

    /// Script a transport failure for `ticket`.
    pub fn fail_close(&self, ticket: Ticket) {
        self.error_tickets.lock().insert(ticket);
    }

    /// Script the acknowledgement returned by `set_automated_trading`.
    pub fn set_autotrade_ok(&self, ok: bool) {
        *self.autotrade_ok.lock() = ok;
    }

    /// Close requests received so far.
    #[must_use]
    pub fn closes(&self) -> Vec<CloseRequest> {
        self.closes.lock().clone()
    }

    /// Automated-trading toggles received so far.
    #[must_use]
    pub fn autotrade_calls(&self) -> Vec<bool> {
        self.autotrade_calls.lock().clone()
    }

    /// Number of snapshot requests received so far.
    #[must_use]
    pub fn snapshot_calls(&self) -> u64 {
        self.snapshot_calls.load(Ordering::SeqCst)
    }
}

impl TradingEngine for MockTradingEngine {
    fn snapshot(&self) -> BoxFuture<'_, EngineResult<AccountSnapshot>> {
        Box::pin(async move {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            if self.snapshot_unavailable.load(Ordering::SeqCst) {
                return Err(EngineError::Unavailable("scripted outage".to_string()));
            }
            let mut queue = self.snapshots.lock();
            match queue.len() {
                0 => Err(EngineError::Unavailable(
                    "no snapshot scripted".to_string(),
                )),
                1 => Ok(queue.front().cloned().unwrap()),
                _ => Ok(queue.pop_front().unwrap()),
            }
        })
    }

    fn close_position(&self, request: CloseRequest) -> BoxFuture<'_, EngineResult<CloseOutcome>> {
        Box::pin(async move {
            let ticket = request.ticket;
            self.closes.lock().push(request);
            if self.error_tickets.lock().contains(&ticket) {
                return Err(EngineError::Unavailable(format!(
                    "scripted transport failure for {ticket}"
                )));
            }
            if self.reject_tickets.lock().contains(&ticket) {
                return Ok(CloseOutcome::rejected("scripted reject"));
            }
            Ok(CloseOutcome::accepted("done"))
        })
    }

    fn set_automated_trading(&self, enabled: bool) -> BoxFuture<'_, EngineResult<bool>> {
        Box::pin(async move {
            self.autotrade_calls.lock().push(enabled);
            Ok(*self.autotrade_ok.lock())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use riskguard_core::Position;
    use rust_decimal_macros::dec;

    fn snapshot(risk: f64, tickets: &[u64]) -> AccountSnapshot {
        AccountSnapshot {
            total_risk_pct: risk,
            positions: tickets
                .iter()
                .map(|t| Position {
                    ticket: Ticket::new(*t),
                    symbol: "EURUSD".to_string(),
                    side: PositionSide::Buy,
                    volume: dec!(0.10),
                    open_time: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
                })
                .collect(),
        }
    }

    fn close_request(ticket: u64) -> CloseRequest {
        CloseRequest {
            ticket: Ticket::new(ticket),
            symbol: "EURUSD".to_string(),
            side: PositionSide::Buy,
            volume: dec!(0.10),
            comment: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_queue_repeats_last_entry() {
        let engine = MockTradingEngine::new();
        engine.push_snapshot(snapshot(3.0, &[1, 2]));
        engine.push_snapshot(snapshot(3.0, &[1]));

        assert_eq!(engine.snapshot().await.unwrap().position_count(), 2);
        assert_eq!(engine.snapshot().await.unwrap().position_count(), 1);
        // Last entry keeps repeating.
        assert_eq!(engine.snapshot().await.unwrap().position_count(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_without_script_is_unavailable() {
        let engine = MockTradingEngine::new();
        assert!(matches!(
            engine.snapshot().await,
            Err(EngineError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_outage() {
        let engine = MockTradingEngine::new();
        engine.push_snapshot(snapshot(3.0, &[1]));
        engine.set_snapshot_unavailable(true);
        assert!(engine.snapshot().await.is_err());

        engine.set_snapshot_unavailable(false);
        assert!(engine.snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_records_and_scripts_outcomes() {
        let engine = MockTradingEngine::new();
        engine.reject_close(Ticket::new(2));
        engine.fail_close(Ticket::new(3));

        assert!(engine.close_position(close_request(1)).await.unwrap().accepted);
        assert!(!engine.close_position(close_request(2)).await.unwrap().accepted);
        assert!(engine.close_position(close_request(3)).await.is_err());

        let closes = engine.closes();
        assert_eq!(closes.len(), 3);
        assert_eq!(closes[0].ticket, Ticket::new(1));
        assert_eq!(closes[2].ticket, Ticket::new(3));
    }

    #[tokio::test]
    async fn test_autotrade_calls_recorded() {
        let engine = MockTradingEngine::new();
        assert!(engine.set_automated_trading(true).await.unwrap());

        engine.set_autotrade_ok(false);
        assert!(!engine.set_automated_trading(false).await.unwrap());

        assert_eq!(engine.autotrade_calls(), vec![true, false]);
    }
}
