//! Plain-text message formatting for enforcement reports.

use std::fmt::Write;

use riskguard_core::{AggregateReport, EventWindowReport};

/// Render an aggregate-risk report as a Telegram message.
#[must_use]
pub fn format_aggregate_report(report: &AggregateReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Aggregate risk enforcement");
    let _ = writeln!(
        text,
        "risk {:.2}% / limit {:.2}% | positions {}",
        report.total_risk_pct, report.threshold_pct, report.positions
    );

    if !report.new_tickets.is_empty() {
        let _ = writeln!(text, "new tickets: {}", join_tickets(&report.new_tickets));
    }
    if !report.closed.is_empty() {
        let closed: Vec<String> = report.closed.iter().map(|c| c.ticket.to_string()).collect();
        let _ = writeln!(text, "closed: {}", closed.join(", "));
    }
    for failure in &report.failed {
        let _ = writeln!(
            text,
            "close FAILED: {} {} ({})",
            failure.ticket, failure.symbol, failure.detail
        );
    }

    let _ = writeln!(
        text,
        "attempts {} -> {} | block {}",
        report.attempts_before,
        report.attempts_after,
        if report.risk_block_after { "ACTIVE" } else { "off" }
    );
    if report.kill_switch_armed_now {
        if let Some(until) = report.kill_switch_until_after {
            let _ = writeln!(text, "kill switch armed until {until}");
        }
    }

    text.trim_end().to_string()
}

/// Render an event-window report as a Telegram message.
#[must_use]
pub fn format_news_report(report: &EventWindowReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Event-window enforcement");

    for affected in &report.affected {
        let labels: Vec<&str> = affected.events.iter().map(|e| e.label.as_str()).collect();
        let _ = writeln!(
            text,
            "{} {} ({})",
            affected.ticket,
            affected.symbol,
            labels.join("; ")
        );
    }

    let _ = writeln!(
        text,
        "closed {} | failed {}",
        report.closed.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        let _ = writeln!(
            text,
            "close FAILED: {} {} ({})",
            failure.ticket, failure.symbol, failure.detail
        );
    }
    if let Some(until) = report.kill_switch_until {
        let _ = writeln!(text, "kill switch armed until {until}");
    }
    if !report.unconfirmed.is_empty() {
        let _ = writeln!(
            text,
            "UNCONFIRMED after wait: {}",
            join_tickets(&report.unconfirmed)
        );
    }

    text.trim_end().to_string()
}

fn join_tickets(tickets: &[riskguard_core::Ticket]) -> String {
    tickets
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use riskguard_core::{AffectedPosition, CalendarEvent, ClosedTicket, Ticket};

    #[test]
    fn test_aggregate_message_carries_transitions_and_failures() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let report = AggregateReport {
            now,
            threshold_pct: 5.0,
            total_risk_pct: 7.25,
            positions: 3,
            baseline_tickets: vec![Ticket::new(1)],
            new_tickets: vec![Ticket::new(100), Ticket::new(101)],
            closed: vec![ClosedTicket {
                ticket: Ticket::new(100),
                symbol: "EURUSD".to_string(),
                detail: "deal 555".to_string(),
            }],
            failed: vec![ClosedTicket {
                ticket: Ticket::new(101),
                symbol: "GBPUSD".to_string(),
                detail: "requote".to_string(),
            }],
            attempts_before: 1,
            attempts_after: 3,
            risk_block_before: false,
            risk_block_after: true,
            kill_switch_active_before: false,
            kill_switch_active_after: true,
            kill_switch_until_before: None,
            kill_switch_until_after: Some(now + chrono::Duration::minutes(60)),
            kill_switch_armed_now: true,
            block_minutes: 60,
        };

        let text = format_aggregate_report(&report);
        assert!(text.contains("7.25%"));
        assert!(text.contains("new tickets: #100, #101"));
        assert!(text.contains("closed: #100"));
        assert!(text.contains("close FAILED: #101 GBPUSD (requote)"));
        assert!(text.contains("attempts 1 -> 3"));
        assert!(text.contains("block ACTIVE"));
        assert!(text.contains("kill switch armed until"));
    }

    #[test]
    fn test_news_message_lists_affected_and_unconfirmed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let report = EventWindowReport {
            affected: vec![AffectedPosition {
                ticket: Ticket::new(42),
                symbol: "EURUSD".to_string(),
                events: vec![CalendarEvent {
                    currency: "USD".to_string(),
                    timestamp: now,
                    label: "Non-Farm Payrolls".to_string(),
                }],
            }],
            closed: vec![],
            failed: vec![],
            kill_switch_until: Some(now + chrono::Duration::minutes(60)),
            unconfirmed: vec![Ticket::new(42)],
        };

        let text = format_news_report(&report);
        assert!(text.contains("#42 EURUSD (Non-Farm Payrolls)"));
        assert!(text.contains("closed 0 | failed 0"));
        assert!(text.contains("UNCONFIRMED after wait: #42"));
    }
}
