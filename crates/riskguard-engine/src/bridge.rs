//! HTTP client for the terminal bridge.
//!
//! The terminal itself has no usable API from this process, so a small
//! bridge service exposes it over local HTTP. Commands are POSTed as typed
//! JSON (`{"type": "..."}`), mirroring the bridge's command dispatch.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use riskguard_core::{AccountSnapshot, PositionSide, Ticket};

use crate::engine::{BoxFuture, CloseOutcome, CloseRequest, TradingEngine};
use crate::error::{EngineError, EngineResult};

/// Default timeout for bridge requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot command.
#[derive(Debug, Serialize)]
struct SnapshotCommand {
    #[serde(rename = "type")]
    command: &'static str,
}

/// Close-position command.
#[derive(Debug, Serialize)]
struct CloseCommand<'a> {
    #[serde(rename = "type")]
    command: &'static str,
    ticket: Ticket,
    symbol: &'a str,
    side: PositionSide,
    volume: Decimal,
    comment: &'a str,
}

/// Automated-trading toggle command.
#[derive(Debug, Serialize)]
struct AutotradeCommand {
    #[serde(rename = "type")]
    command: &'static str,
    enabled: bool,
}

/// Bridge verdict on a close command.
#[derive(Debug, Deserialize)]
struct CloseResponse {
    ok: bool,
    #[serde(default)]
    detail: Option<String>,
}

/// Bridge acknowledgement of an automated-trading toggle.
#[derive(Debug, Deserialize)]
struct AutotradeResponse {
    ok: bool,
}

/// HTTP implementation of [`TradingEngine`] against the terminal bridge.
pub struct BridgeClient {
    client: Client,
    base_url: String,
}

impl BridgeClient {
    /// Create a new bridge client.
    ///
    /// # Arguments
    /// * `base_url` - Command endpoint of the bridge (e.g.
    ///   "http://127.0.0.1:18650/command")
    pub fn new(base_url: impl Into<String>) -> EngineResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a bridge client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post<R>(&self, command: &impl Serialize) -> EngineResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.base_url)
            .json(command)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Unavailable(format!("Bridge timeout: {e}"))
                } else {
                    EngineError::Http(format!("Bridge request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Http(format!("Bridge HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::Parse(format!("Failed to parse bridge response: {e}")))
    }

    async fn fetch_snapshot(&self) -> EngineResult<AccountSnapshot> {
        let snapshot: AccountSnapshot = self
            .post(&SnapshotCommand {
                command: "snapshot",
            })
            .await?;
        debug!(
            total_risk_pct = snapshot.total_risk_pct,
            positions = snapshot.position_count(),
            "Snapshot received"
        );
        Ok(snapshot)
    }

    async fn send_close(&self, request: CloseRequest) -> EngineResult<CloseOutcome> {
        let response: CloseResponse = self
            .post(&CloseCommand {
                command: "close_position",
                ticket: request.ticket,
                symbol: &request.symbol,
                side: request.side,
                volume: request.volume,
                comment: &request.comment,
            })
            .await?;

        let detail = response.detail.unwrap_or_default();
        Ok(if response.ok {
            CloseOutcome::accepted(detail)
        } else {
            CloseOutcome::rejected(detail)
        })
    }

    async fn send_autotrade(&self, enabled: bool) -> EngineResult<bool> {
        let response: AutotradeResponse = self
            .post(&AutotradeCommand {
                command: "set_automated_trading",
                enabled,
            })
            .await?;
        Ok(response.ok)
    }
}

impl TradingEngine for BridgeClient {
    fn snapshot(&self) -> BoxFuture<'_, EngineResult<AccountSnapshot>> {
        Box::pin(self.fetch_snapshot())
    }

    fn close_position(&self, request: CloseRequest) -> BoxFuture<'_, EngineResult<CloseOutcome>> {
        Box::pin(self.send_close(request))
    }

    fn set_automated_trading(&self, enabled: bool) -> BoxFuture<'_, EngineResult<bool>> {
        Box::pin(self.send_autotrade(enabled))
    }
}
