//! Plain-text rendering of view state for the terminal.

use std::fmt::Write;

use crate::notifications::ConnectionState;
use crate::types::{Bot, ChartSeries, LogEntry, Notification, Trade};

pub fn bots_table(bots: &[Bot]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Bots ===");
    if bots.is_empty() {
        let _ = writeln!(out, "No bots yet");
        return out;
    }

    let _ = writeln!(out, "{:<6} {:<24} {:<12} {}", "ID", "Name", "Status", "Description");
    let _ = writeln!(out, "{}", "-".repeat(70));
    for bot in bots {
        let _ = writeln!(
            out,
            "{:<6} {:<24} {:<12} {}",
            bot.id,
            bot.name,
            bot.status,
            bot.description.as_deref().unwrap_or("")
        );
    }
    out
}

pub fn bot_detail(bot: &Bot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n--- {} ---", bot.name);
    let _ = writeln!(out, "ID: {}", bot.id);
    let _ = writeln!(out, "Status: {}", bot.status);
    if let Some(description) = &bot.description {
        let _ = writeln!(out, "Description: {}", description);
    }
    let mut actions = Vec::new();
    if bot.can_start() {
        actions.push("start");
    }
    if bot.can_pause() {
        actions.push("pause");
    }
    actions.push("delete");
    let _ = writeln!(out, "Actions: {}", actions.join(", "));
    out
}

pub fn trades_table(trades: &[&Trade]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Trades ===");
    if trades.is_empty() {
        let _ = writeln!(out, "No trades");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<6} {:<22} {:<5} {:>14} {:>14} {}",
        "ID", "Time", "Type", "Amount", "Price", "Bot"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));
    for trade in trades {
        let bot = trade.bot().map(|b| b.to_string()).unwrap_or_default();
        let amount = trade.amount.map_or_else(|| "-".to_string(), |a| a.to_string());
        let price = trade.price.map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));
        let _ = writeln!(
            out,
            "{:<6} {:<22} {:<5} {:>14} {:>14} {}",
            trade.id, trade.time, trade.trade_type, amount, price, bot
        );
    }
    out
}

pub fn logs_table(logs: &[LogEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Logs ===");
    if logs.is_empty() {
        let _ = writeln!(out, "No log entries");
        return out;
    }
    for log in logs {
        let _ = writeln!(out, "[{}] {}", log.time, log.message);
    }
    out
}

/// One row per time point; missing indicator values print as `-`
pub fn chart_table(chart: &ChartSeries) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Market History ===");
    if chart.is_empty() {
        let _ = writeln!(out, "No market data");
        return out;
    }

    let _ = write!(out, "{:<22}", "Time");
    for series in &chart.series {
        let _ = write!(out, " {:>12}", series.name);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "-".repeat(22 + 13 * chart.series.len()));

    for (i, time) in chart.times.iter().enumerate() {
        let _ = write!(out, "{:<22}", time);
        for series in &chart.series {
            match series.data.get(i).copied().flatten() {
                Some(value) => {
                    let _ = write!(out, " {:>12.2}", value);
                }
                None => {
                    let _ = write!(out, " {:>12}", "-");
                }
            }
        }
        let _ = writeln!(out);
    }
    out
}

pub fn notification_line(notification: &Notification) -> String {
    let mut line = format!(
        "[{}] #{} {}",
        notification.received_at.format("%H:%M:%S"),
        notification.id,
        notification.display_text()
    );
    if let Some(server_id) = notification.server_id() {
        let _ = write!(line, " (server id {})", server_id);
    }
    line
}

pub fn notifications_panel(
    notifications: &[Notification],
    state: ConnectionState,
    status: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Notifications ({}) ===", state);
    if let Some(status) = status {
        let _ = writeln!(out, "! {}", status);
    }
    if notifications.is_empty() {
        let _ = writeln!(out, "No notifications");
    }
    for notification in notifications {
        let _ = writeln!(out, "{}", notification_line(notification));
    }
    out
}
