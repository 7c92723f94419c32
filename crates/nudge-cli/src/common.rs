//! Shared helpers for CLI commands.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nudge_core::{
    reminder_key, Config, NotificationEngine, Notifier, NotifierError, SqliteStateStore,
};

/// Notifier for the terminal: rings the bell for audible alerts and writes
/// reminders to stderr, keeping stdout for JSON output.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn render(&self, token: &str, repeat_count: u32) -> Result<(), NotifierError> {
        let mut err = std::io::stderr().lock();
        writeln!(
            err,
            "\u{7}reminder #{repeat_count}: unread messages in {token} [{}]",
            reminder_key(token)
        )
        .map_err(|e| NotifierError::RenderFailed {
            token: token.to_string(),
            message: e.to_string(),
        })
    }

    fn render_audible_alert(&self, token: &str, summary: &str) -> Result<(), NotifierError> {
        let mut err = std::io::stderr().lock();
        writeln!(err, "\u{7}{token}: {summary}").map_err(|e| NotifierError::RenderFailed {
            token: token.to_string(),
            message: e.to_string(),
        })
    }
}

/// Open the durable engine with the on-disk configuration.
pub fn open_engine(config: &Config) -> Result<NotificationEngine, Box<dyn std::error::Error>> {
    let store = SqliteStateStore::open()?;
    Ok(NotificationEngine::new(
        Arc::new(store),
        Arc::new(TerminalNotifier),
        config.notifications.clone(),
    ))
}

/// Parse an RFC 3339 timestamp given on the command line.
pub fn parse_at(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{value}': {e}"))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
