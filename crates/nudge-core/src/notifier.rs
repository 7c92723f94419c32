//! Rendering collaborators.
//!
//! The engine decides whether to signal; a [`Notifier`] does the signalling.
//! Platform code implements this trait for its notification system.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::conversation::reminder_key;
use crate::error::NotifierError;

/// Every notification backend implements this trait.
/// Implementations must not block for long; the scheduler calls `render`
/// once per due conversation during a scan.
pub trait Notifier: Send + Sync {
    /// Render a reminder for a conversation that is still unread.
    /// `repeat_count` is 1 for the first reminder of an episode.
    fn render(&self, token: &str, repeat_count: u32) -> Result<(), NotifierError>;

    /// Render an audible alert for a newly received message.
    fn render_audible_alert(&self, token: &str, summary: &str) -> Result<(), NotifierError>;
}

/// Notifier that only emits log events. Useful as a default backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn render(&self, token: &str, repeat_count: u32) -> Result<(), NotifierError> {
        tracing::info!(
            token,
            repeat_count,
            key = %reminder_key(token),
            "reminder: conversation still unread"
        );
        Ok(())
    }

    fn render_audible_alert(&self, token: &str, summary: &str) -> Result<(), NotifierError> {
        tracing::info!(token, summary, "audible alert");
        Ok(())
    }
}

/// A call received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Reminder { token: String, repeat_count: u32 },
    AudibleAlert { token: String, summary: String },
}

/// Notifier that records every call and can be told to fail for given tokens.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Rendered>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent render for `token` fail.
    pub fn fail_for(&self, token: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(token.to_string());
        }
    }

    /// Stop failing renders for `token`.
    pub fn recover(&self, token: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(token);
        }
    }

    /// Every successful render so far, in call order.
    pub fn calls(&self) -> Vec<Rendered> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Successful reminders as `(token, repeat_count)` pairs.
    pub fn reminders(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Rendered::Reminder {
                    token,
                    repeat_count,
                } => Some((token, repeat_count)),
                Rendered::AudibleAlert { .. } => None,
            })
            .collect()
    }

    fn check(&self, token: &str) -> Result<(), NotifierError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| NotifierError::Unavailable("recorder lock poisoned".to_string()))?;
        if failing.contains(token) {
            return Err(NotifierError::RenderFailed {
                token: token.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: Rendered) -> Result<(), NotifierError> {
        self.calls
            .lock()
            .map_err(|_| NotifierError::Unavailable("recorder lock poisoned".to_string()))?
            .push(call);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn render(&self, token: &str, repeat_count: u32) -> Result<(), NotifierError> {
        self.check(token)?;
        self.record(Rendered::Reminder {
            token: token.to_string(),
            repeat_count,
        })
    }

    fn render_audible_alert(&self, token: &str, summary: &str) -> Result<(), NotifierError> {
        self.check(token)?;
        self.record(Rendered::AudibleAlert {
            token: token.to_string(),
            summary: summary.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_records_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.render_audible_alert("a", "hi").unwrap();
        notifier.render("a", 1).unwrap();

        assert_eq!(
            notifier.calls(),
            vec![
                Rendered::AudibleAlert {
                    token: "a".into(),
                    summary: "hi".into()
                },
                Rendered::Reminder {
                    token: "a".into(),
                    repeat_count: 1
                },
            ]
        );
        assert_eq!(notifier.reminders(), vec![("a".to_string(), 1)]);
    }

    #[test]
    fn injected_failure_is_per_token() {
        let notifier = RecordingNotifier::new();
        notifier.fail_for("bad");

        assert!(matches!(
            notifier.render("bad", 1),
            Err(NotifierError::RenderFailed { .. })
        ));
        assert!(notifier.render("good", 1).is_ok());

        notifier.recover("bad");
        assert!(notifier.render("bad", 1).is_ok());
        assert_eq!(notifier.reminders().len(), 2);
    }

    #[test]
    fn log_notifier_never_fails() {
        assert!(LogNotifier.render("a", 2).is_ok());
        assert!(LogNotifier.render_audible_alert("a", "hello").is_ok());
    }
}
