//! Telegram notification sink for enforcement reports.
//!
//! Notification is strictly fire-and-forget: a delivery failure is logged
//! and swallowed by the caller, and never influences enforcement. One
//! consolidated message is sent per tick that produced a state change.

pub mod error;
pub mod format;
pub mod telegram;

pub use error::{NotifyError, NotifyResult};
pub use format::{format_aggregate_report, format_news_report};
pub use telegram::TelegramNotifier;
