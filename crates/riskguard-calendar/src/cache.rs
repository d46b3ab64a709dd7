//! Local JSON cache of calendar events.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use riskguard_core::CalendarEvent;

use crate::error::CalendarResult;

/// On-disk cache layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCalendar {
    fetched_at: DateTime<Utc>,
    events: Vec<CalendarEvent>,
}

/// File-backed event cache with a maximum age.
#[derive(Debug)]
pub struct CalendarCache {
    path: PathBuf,
    max_age: Duration,
}

impl CalendarCache {
    /// Create a cache backed by `path`, treating entries older than
    /// `max_age_days` as absent.
    pub fn new(path: impl Into<PathBuf>, max_age_days: i64) -> Self {
        Self {
            path: path.into(),
            max_age: Duration::days(max_age_days),
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cached events, sorted by timestamp.
    ///
    /// Returns `None` when the cache is missing, unreadable or older than
    /// the configured maximum age; none of these are errors, the caller
    /// just has no calendar this tick.
    #[must_use]
    pub fn load(&self, now: DateTime<Utc>) -> Option<Vec<CalendarEvent>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Calendar cache absent");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "Calendar cache unreadable");
                return None;
            }
        };

        let cached: CachedCalendar = match serde_json::from_slice(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "Calendar cache corrupt");
                return None;
            }
        };

        if now - cached.fetched_at > self.max_age {
            warn!(
                fetched_at = %cached.fetched_at,
                "Calendar cache stale, ignoring until next refresh"
            );
            return None;
        }

        let mut events = cached.events;
        events.sort_by_key(|e| e.timestamp);
        debug!(events = events.len(), "Calendar cache loaded");
        Some(events)
    }

    /// Replace the cache contents atomically.
    pub fn store(&self, events: &[CalendarEvent], now: DateTime<Utc>) -> CalendarResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let cached = CachedCalendar {
            fetched_at: now,
            events: events.to_vec(),
        };

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&serde_json::to_vec_pretty(&cached)?)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn event(currency: &str, timestamp: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            currency: currency.to_string(),
            timestamp,
            label: format!("{currency} event"),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_load_missing_cache_returns_none() {
        let dir = TempDir::new().unwrap();
        let cache = CalendarCache::new(dir.path().join("calendar.json"), 7);
        assert!(cache.load(now()).is_none());
    }

    #[test]
    fn test_store_then_load_sorts_by_timestamp() {
        let dir = TempDir::new().unwrap();
        let cache = CalendarCache::new(dir.path().join("calendar.json"), 7);

        let late = event("USD", now() + Duration::hours(3));
        let early = event("EUR", now() + Duration::hours(1));
        cache.store(&[late.clone(), early.clone()], now()).unwrap();

        let events = cache.load(now()).unwrap();
        assert_eq!(events, vec![early, late]);
    }

    #[test]
    fn test_stale_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = CalendarCache::new(dir.path().join("calendar.json"), 7);

        let fetched = now() - Duration::days(8);
        cache.store(&[event("USD", now())], fetched).unwrap();

        assert!(cache.load(now()).is_none());
        // Still fresh from the perspective of a week ago.
        assert!(cache.load(fetched + Duration::days(7)).is_some());
    }

    #[test]
    fn test_corrupt_cache_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calendar.json");
        fs::write(&path, b"[broken").unwrap();

        let cache = CalendarCache::new(&path, 7);
        assert!(cache.load(now()).is_none());
    }

    #[test]
    fn test_store_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let cache = CalendarCache::new(dir.path().join("calendar.json"), 7);

        cache
            .store(&[event("USD", now()), event("EUR", now())], now())
            .unwrap();
        cache.store(&[event("JPY", now())], now()).unwrap();

        let events = cache.load(now()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].currency, "JPY");
    }
}
