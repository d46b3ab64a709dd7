//! Telegram bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use riskguard_core::{AggregateReport, EventWindowReport};

use crate::error::{NotifyError, NotifyResult};
use crate::format::{format_aggregate_report, format_news_report};

/// Default timeout for Telegram requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// sendMessage request body.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram notification sink.
pub struct TelegramNotifier {
    client: Client,
    send_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for a bot token and chat.
    pub fn new(bot_token: &str, chat_id: impl Into<String>) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            send_url: format!("https://api.telegram.org/bot{bot_token}/sendMessage"),
            chat_id: chat_id.into(),
        })
    }

    /// Send a consolidated aggregate-risk message.
    pub async fn notify_aggregate(&self, report: &AggregateReport) -> NotifyResult<()> {
        self.send(&format_aggregate_report(report)).await
    }

    /// Send a consolidated event-window message.
    pub async fn notify_news(&self, report: &EventWindowReport) -> NotifyResult<()> {
        self.send(&format_news_report(report)).await
    }

    async fn send(&self, text: &str) -> NotifyResult<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        let response = self
            .client
            .post(&self.send_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("Telegram request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http(format!("Telegram HTTP {status}: {detail}")));
        }

        debug!("Telegram notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_wire_format() {
        let body = SendMessage {
            chat_id: "-100123",
            text: "hello",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["chat_id"], "-100123");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_notifier_builds_send_url_from_token() {
        let notifier = TelegramNotifier::new("abc:123", "-100123").unwrap();
        assert!(notifier.send_url.ends_with("/botabc:123/sendMessage"));
    }
}
