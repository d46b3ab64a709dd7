//! HTTP client for the upstream calendar feed.

use std::time::Duration;

use reqwest::Client;
use tracing::info;

use riskguard_core::CalendarEvent;

use crate::error::{CalendarError, CalendarResult};

/// Default timeout for feed requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client fetching the weekly event list.
pub struct CalendarClient {
    client: Client,
    feed_url: String,
}

impl CalendarClient {
    /// Create a new feed client.
    ///
    /// # Arguments
    /// * `feed_url` - URL returning a JSON array of calendar events
    pub fn new(feed_url: impl Into<String>) -> CalendarResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| CalendarError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            feed_url: feed_url.into(),
        })
    }

    /// Fetch the current event list, sorted by timestamp.
    ///
    /// Events without a currency tag cannot match any position and are
    /// dropped here.
    pub async fn fetch(&self) -> CalendarResult<Vec<CalendarEvent>> {
        info!(url = %self.feed_url, "Fetching calendar feed");

        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| CalendarError::Http(format!("Feed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Http(format!("Feed HTTP {status}: {body}")));
        }

        let mut events: Vec<CalendarEvent> = response
            .json()
            .await
            .map_err(|e| CalendarError::Parse(format!("Failed to parse feed: {e}")))?;

        events.retain(|e| !e.currency.is_empty());
        events.sort_by_key(|e| e.timestamp);

        info!(events = events.len(), "Calendar feed fetched");
        Ok(events)
    }
}
