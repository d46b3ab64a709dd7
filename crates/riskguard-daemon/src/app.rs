//! Main application orchestration.
//!
//! One single-threaded control loop drives both enforcers on a fixed
//! cadence. Per tick, strictly in order: re-enable check (with a settle
//! window after a re-enable fires), calendar refresh, aggregate
//! enforcement, event-window enforcement, and (when the event path
//! affected positions) the confirmed-closure barrier followed by the
//! automated-trading disable and one consolidated notification.
//!
//! The on-disk records are mutated only by this loop; running two daemon
//! instances against the same state directory is an operational error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use tracing::{debug, info, warn};

use riskguard_calendar::{CalendarCache, CalendarClient};
use riskguard_core::{
    AggregateReport, CalendarEvent, EventWindowReport, PairSplitMapper, Ticket,
};
use riskguard_engine::{BridgeClient, DynTradingEngine};
use riskguard_enforcer::{AggregateRiskEnforcer, EventWindowEnforcer, KillSwitch};
use riskguard_notify::TelegramNotifier;
use riskguard_state::FileStore;
use riskguard_telemetry::EnforcementStats;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Periodic stats summary interval (1 hour).
const SUMMARY_INTERVAL: Duration = Duration::from_secs(3600);

/// Main application.
pub struct Application {
    config: AppConfig,
    engine: DynTradingEngine,
    kill_switch: Arc<KillSwitch>,
    aggregate: AggregateRiskEnforcer,
    news: EventWindowEnforcer,
    calendar_cache: CalendarCache,
    calendar_client: Option<CalendarClient>,
    notifier: Option<TelegramNotifier>,
    stats: EnforcementStats,
    /// Cached calendar events between cache reloads.
    events: Vec<CalendarEvent>,
    last_cache_reload: Option<Instant>,
    /// Day of the last successful upstream feed fetch.
    last_feed_fetch_day: Option<NaiveDate>,
    /// When the last re-enable fired; enforcement pauses briefly after it.
    last_reenable: Option<Instant>,
}

impl Application {
    /// Create an application talking to the configured bridge.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let engine: DynTradingEngine = Arc::new(BridgeClient::with_timeout(
            config.engine.bridge_url.clone(),
            Duration::from_secs(config.engine.request_timeout_secs),
        )?);
        Self::with_engine(config, engine)
    }

    /// Create an application over an arbitrary engine implementation.
    pub fn with_engine(config: AppConfig, engine: DynTradingEngine) -> AppResult<Self> {
        let kill_switch = Arc::new(KillSwitch::new(FileStore::new(
            config.state.kill_switch_path(),
        )));

        let aggregate = AggregateRiskEnforcer::new(
            engine.clone(),
            FileStore::new(config.state.limits_path()),
            kill_switch.clone(),
            config.risk.clone(),
        );

        let news = EventWindowEnforcer::new(
            engine.clone(),
            kill_switch.clone(),
            Arc::new(PairSplitMapper),
            config.news.clone(),
        );

        let calendar_cache =
            CalendarCache::new(config.calendar.cache_path.clone(), config.calendar.max_age_days);
        let calendar_client = match &config.calendar.feed_url {
            Some(url) => Some(CalendarClient::new(url.clone())?),
            None => None,
        };

        let notifier = match &config.telegram {
            Some(telegram) => Some(TelegramNotifier::new(
                &telegram.bot_token,
                telegram.chat_id.clone(),
            )?),
            None => None,
        };

        Ok(Self {
            config,
            engine,
            kill_switch,
            aggregate,
            news,
            calendar_cache,
            calendar_client,
            notifier,
            stats: EnforcementStats::new(Utc::now()),
            events: Vec::new(),
            last_cache_reload: None,
            last_feed_fetch_day: None,
            last_reenable: None,
        })
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run(mut self) -> AppResult<()> {
        // Startup probe: without the engine no enforcement is possible, so
        // this is the one failure that aborts the process.
        let probe = self
            .engine
            .snapshot()
            .await
            .map_err(|e| AppError::Startup(format!("First engine snapshot failed: {e}")))?;
        info!(
            total_risk_pct = probe.total_risk_pct,
            positions = probe.position_count(),
            "Connected to trading engine"
        );

        info!(
            poll_secs = self.config.control.poll_secs,
            threshold_pct = self.config.risk.threshold_pct,
            window_minutes = self.config.news.window_minutes,
            "Entering control loop"
        );

        let mut tick_interval =
            tokio::time::interval(Duration::from_secs(self.config.control.poll_secs.max(1)));
        let mut summary_interval = tokio::time::interval(SUMMARY_INTERVAL);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if let Err(e) = self.run_tick(Utc::now()).await {
                        warn!(?e, "Tick failed");
                        self.stats.record_skipped_tick();
                        tokio::time::sleep(Duration::from_secs(
                            self.config.control.error_backoff_secs,
                        ))
                        .await;
                    }
                }

                _ = summary_interval.tick() => {
                    self.stats.output_summary();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.stats.output_summary();
        Ok(())
    }

    /// Run one enforcement tick.
    async fn run_tick(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        // 1. Flip automated trading back on if the suspension expired, then
        //    give the terminal a moment to settle before enforcing again.
        if self
            .kill_switch
            .maybe_reenable(self.engine.as_ref(), now)
            .await?
        {
            self.stats.record_reenable();
            self.last_reenable = Some(Instant::now());
        }
        if let Some(at) = self.last_reenable {
            let settle = Duration::from_secs(self.config.control.reenable_settle_secs);
            if at.elapsed() < settle {
                debug!("Settling after re-enable");
                return Ok(());
            }
        }

        // 2. Calendar refresh (upstream weekly, cache on its own cadence).
        self.refresh_calendar(now).await;

        // 3. Snapshot; an unreachable engine skips the tick.
        let snapshot = match self.engine.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(?e, "Engine unreachable, skipping tick");
                self.stats.record_skipped_tick();
                return Ok(());
            }
        };

        // 4. Aggregate enforcement, fully applied (state persisted) before
        //    the event path runs.
        let aggregate = self.aggregate.enforce(&snapshot, now).await?;
        self.stats
            .record_closes(aggregate.closed.len() as u64, aggregate.failed.len() as u64);
        if aggregate.kill_switch_armed_now {
            self.stats.record_switch_arm();
        }
        if aggregate.has_changes() {
            info!(
                total_risk_pct = aggregate.total_risk_pct,
                new_tickets = aggregate.new_tickets.len(),
                closed = aggregate.closed.len(),
                failed = aggregate.failed.len(),
                attempts = aggregate.attempts_after,
                risk_block = aggregate.risk_block_after,
                "Aggregate enforcement acted"
            );
            self.notify_aggregate(&aggregate).await;
        }

        // 5. Event-window enforcement against the cached calendar.
        let mut news = self
            .news
            .enforce_window(&snapshot, &self.events, now)
            .await?;
        if news.has_affected() {
            self.stats.record_news_batch();
            self.stats
                .record_closes(news.closed.len() as u64, news.failed.len() as u64);
            if news.kill_switch_until.is_some() {
                self.stats.record_switch_arm();
            }

            // 6. Wait until every affected ticket is confirmed gone, then
            //    disable automated trading for the suspension window.
            let leftover = self.wait_for_confirmed_closure(&news.affected_tickets()).await;
            if leftover.is_empty() {
                match self.engine.set_automated_trading(false).await {
                    Ok(true) => info!("Automated trading disabled for event window"),
                    Ok(false) => warn!("Engine refused to disable automated trading"),
                    Err(e) => warn!(?e, "Disable call failed"),
                }
            } else {
                warn!(
                    ?leftover,
                    "Gave up waiting for closure confirmation; automated trading left untouched"
                );
                news.unconfirmed = leftover;
            }

            self.notify_news(&news).await;
        }

        self.stats.record_tick();
        Ok(())
    }

    /// Re-snapshot until none of `tickets` remains open.
    ///
    /// Returns the tickets still open when the configured bound expired, or
    /// an empty vector once all are confirmed closed. Without a configured
    /// bound this waits indefinitely (the reference behavior).
    async fn wait_for_confirmed_closure(&self, tickets: &[Ticket]) -> Vec<Ticket> {
        let targets: BTreeSet<Ticket> = tickets.iter().copied().collect();
        let deadline = self
            .config
            .control
            .confirm_timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let poll = Duration::from_secs(self.config.control.confirm_poll_secs);

        loop {
            let remaining: Vec<Ticket> = match self.engine.snapshot().await {
                Ok(snapshot) => {
                    let alive = snapshot.ticket_set();
                    targets.intersection(&alive).copied().collect()
                }
                Err(e) => {
                    // Can't confirm anything this round; keep waiting.
                    warn!(?e, "Snapshot failed during closure confirmation");
                    targets.iter().copied().collect()
                }
            };

            if remaining.is_empty() {
                info!("All affected positions confirmed closed");
                return Vec::new();
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return remaining;
                }
            }

            debug!(?remaining, "Waiting for confirmed closure");
            tokio::time::sleep(poll).await;
        }
    }

    /// Refresh calendar data: upstream fetch on Sundays (once per day),
    /// cache re-read on its own cadence.
    async fn refresh_calendar(&mut self, now: DateTime<Utc>) {
        if let Some(client) = &self.calendar_client {
            let today = now.date_naive();
            if now.weekday() == Weekday::Sun && self.last_feed_fetch_day != Some(today) {
                match client.fetch().await {
                    Ok(events) => {
                        if let Err(e) = self.calendar_cache.store(&events, now) {
                            warn!(?e, "Failed to store calendar cache");
                        }
                        self.last_feed_fetch_day = Some(today);
                        // Make the fresh events visible immediately.
                        self.last_cache_reload = None;
                    }
                    Err(e) => warn!(?e, "Calendar fetch failed"),
                }
            }
        }

        let reload = Duration::from_secs(self.config.calendar.reload_minutes * 60);
        let due = self
            .last_cache_reload
            .map_or(true, |at| at.elapsed() >= reload);
        if due {
            self.events = self.calendar_cache.load(now).unwrap_or_default();
            self.last_cache_reload = Some(Instant::now());
        }
    }

    async fn notify_aggregate(&self, report: &AggregateReport) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify_aggregate(report).await {
                warn!(?e, "Aggregate notification failed");
            }
        }
    }

    async fn notify_news(&self, report: &EventWindowReport) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify_news(report).await {
                warn!(?e, "News notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use riskguard_core::{AccountSnapshot, Position, PositionSide};
    use riskguard_engine::MockTradingEngine;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn position(ticket: u64, symbol: &str, age_seconds: i64) -> Position {
        Position {
            ticket: Ticket::new(ticket),
            symbol: symbol.to_string(),
            side: PositionSide::Buy,
            volume: dec!(0.10),
            open_time: now() - ChronoDuration::seconds(age_seconds),
        }
    }

    fn snapshot(risk: f64, positions: Vec<Position>) -> AccountSnapshot {
        AccountSnapshot {
            total_risk_pct: risk,
            positions,
        }
    }

    struct Fixture {
        _dir: TempDir,
        engine: Arc<MockTradingEngine>,
        app: Application,
    }

    fn fixture(mut config: AppConfig) -> Fixture {
        let dir = TempDir::new().unwrap();
        config.state.dir = dir.path().join("state");
        config.calendar.cache_path = dir.path().join("state/calendar.json");
        // Tests drive the barrier with scripted snapshots; no real waiting.
        config.control.confirm_poll_secs = 0;

        let engine = Arc::new(MockTradingEngine::new());
        let app = Application::with_engine(config, engine.clone()).unwrap();
        Fixture {
            _dir: dir,
            engine,
            app,
        }
    }

    fn store_calendar(fixture: &Fixture, events: &[CalendarEvent]) {
        fixture.app.calendar_cache.store(events, now()).unwrap();
    }

    fn usd_event(offset_minutes: i64) -> CalendarEvent {
        CalendarEvent {
            currency: "USD".to_string(),
            timestamp: now() + ChronoDuration::minutes(offset_minutes),
            label: "USD release".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tick_skips_when_engine_unreachable() {
        let mut f = fixture(AppConfig::default());
        f.engine.set_snapshot_unavailable(true);

        // A transient outage is not an error; the tick just skips.
        f.app.run_tick(now()).await.unwrap();
        assert!(f.engine.closes().is_empty());
    }

    #[tokio::test]
    async fn test_news_flow_closes_waits_and_disables() {
        let mut f = fixture(AppConfig::default());
        store_calendar(&f, &[usd_event(5)]);

        let pos = position(1, "EURUSD", 10);
        // Tick snapshot, then two barrier polls: still open, then gone.
        f.engine.push_snapshot(snapshot(1.0, vec![pos.clone()]));
        f.engine.push_snapshot(snapshot(1.0, vec![pos]));
        f.engine.push_snapshot(snapshot(1.0, vec![]));

        f.app.run_tick(now()).await.unwrap();

        let closes = f.engine.closes();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].comment, "riskguard news-window");
        // The disable fired only after the barrier confirmed the closure.
        assert_eq!(f.engine.autotrade_calls(), vec![false]);
        assert!(f.app.kill_switch.status(now()).active);
        // Tick + at least two barrier polls.
        assert!(f.engine.snapshot_calls() >= 3);
    }

    #[tokio::test]
    async fn test_bounded_barrier_reports_leftovers_and_skips_disable() {
        let mut config = AppConfig::default();
        config.control.confirm_timeout_secs = Some(0);
        let mut f = fixture(config);
        store_calendar(&f, &[usd_event(5)]);

        let pos = position(1, "EURUSD", 10);
        // The position never leaves the snapshot.
        f.engine.push_snapshot(snapshot(1.0, vec![pos]));

        f.app.run_tick(now()).await.unwrap();

        assert_eq!(f.engine.closes().len(), 1);
        // Positions may still be live: automated trading stays untouched.
        assert!(f.engine.autotrade_calls().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_runs_before_news_and_state_persists() {
        let mut f = fixture(AppConfig::default());

        // First tick captures the baseline.
        f.engine.push_snapshot(snapshot(3.0, vec![position(1, "EURUSD", 7200)]));
        f.app.run_tick(now()).await.unwrap();
        assert!(f.engine.closes().is_empty());

        // Second tick: risk exceeded with one new ticket.
        f.engine.push_snapshot(snapshot(
            7.0,
            vec![position(1, "EURUSD", 7200), position(100, "GBPUSD", 7200)],
        ));
        f.app.run_tick(now() + ChronoDuration::seconds(3)).await.unwrap();

        let closes = f.engine.closes();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].ticket, Ticket::new(100));
        assert_eq!(closes[0].comment, "riskguard agg-limit");
    }

    #[tokio::test]
    async fn test_settle_window_pauses_enforcement_after_reenable() {
        let mut config = AppConfig::default();
        config.control.reenable_settle_secs = 60;
        let mut f = fixture(config);

        // An expired suspension re-enables on the next tick.
        f.app.kill_switch.arm_until(now() - ChronoDuration::minutes(1)).unwrap();

        f.app.run_tick(now()).await.unwrap();
        assert_eq!(f.engine.autotrade_calls(), vec![true]);
        // Still inside the settle window: no snapshot, no enforcement.
        f.app.run_tick(now() + ChronoDuration::seconds(3)).await.unwrap();
        assert_eq!(f.engine.snapshot_calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_calendar_means_no_event_enforcement() {
        let mut f = fixture(AppConfig::default());
        // Cache written 8 days ago is past max_age_days.
        f.app
            .calendar_cache
            .store(&[usd_event(5)], now() - ChronoDuration::days(8))
            .unwrap();

        f.engine.push_snapshot(snapshot(1.0, vec![position(1, "EURUSD", 10)]));
        f.app.run_tick(now()).await.unwrap();

        assert!(f.engine.closes().is_empty());
    }
}
