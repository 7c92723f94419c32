//! Notification debounce and escalation engine.
//!
//! ```text
//! message ──> UnreadTracker ──> DebounceGate ──> Notifier::render_audible_alert
//!                  │
//!                  └── StateStore <── RepeatScheduler (periodic)
//!                                        │
//!                                        └── EscalationPolicy ──> Notifier::render
//! ```
//!
//! [`NotificationEngine`] wires the pieces to one store, one notifier and one
//! set of runtime-mutable settings.

mod debounce;
mod escalation;
mod scheduler;
mod unread;

pub use debounce::{is_audible, DebounceGate};
pub use escalation::{due_for_reminder, EscalationPolicy};
pub use scheduler::{RepeatScheduler, ScanReport, SchedulerHandle};
pub use unread::UnreadTracker;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::conversation::ConversationState;
use crate::error::StoreError;
use crate::events::Event;
use crate::notifier::Notifier;
use crate::storage::{NotificationsConfig, StateStore};

/// Notification settings shared by every engine component.
///
/// Cloning yields another handle to the same settings, so a change made
/// through one handle is seen by the next operation of every component.
#[derive(Debug, Clone, Default)]
pub struct Settings(Arc<RwLock<NotificationsConfig>>);

impl Settings {
    pub fn new(config: NotificationsConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Snapshot of the current settings.
    pub fn current(&self) -> NotificationsConfig {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: NotificationsConfig) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

/// Result of feeding one incoming message into the engine.
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    pub token: String,
    /// The message started a new unread episode.
    pub new_episode: bool,
    /// The debounce gate allowed a sound for this message.
    pub audible: bool,
    /// Set when the gate allowed a sound but the notifier failed to play it.
    pub alert_error: Option<String>,
    pub events: Vec<Event>,
}

/// A conversation's stored state plus what the escalation policy expects next.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationStatus {
    #[serde(flatten)]
    pub state: ConversationState,
    pub next_reminder_at: Option<DateTime<Utc>>,
    pub reminders_remaining: u32,
}

/// Entry point for the surrounding application.
#[derive(Clone)]
pub struct NotificationEngine {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    tracker: UnreadTracker,
    gate: DebounceGate,
    scheduler: RepeatScheduler,
}

impl NotificationEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        config: NotificationsConfig,
    ) -> Self {
        let settings = Settings::new(config);
        Self {
            tracker: UnreadTracker::new(store.clone()),
            gate: DebounceGate::new(store.clone(), settings.clone()),
            scheduler: RepeatScheduler::new(store.clone(), notifier.clone(), settings.clone()),
            store,
            notifier,
            settings,
        }
    }

    /// A message arrived for `token`.
    ///
    /// Marks the conversation unread, asks the debounce gate whether the
    /// message may make a sound and, if so, asks the notifier to play it.
    /// A notifier failure is reported in the outcome rather than as an error.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be read or written; the
    /// event should then be treated as lost.
    pub fn on_message_received(
        &self,
        token: &str,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageOutcome, StoreError> {
        let new_episode = self.tracker.on_message_received(token, now)?;
        let audible = self.gate.should_signal(token, now)?;

        let mut events = Vec::new();
        if new_episode {
            events.push(Event::UnreadStarted {
                token: token.to_string(),
                at: now,
            });
        }

        let mut alert_error = None;
        if audible {
            match self.notifier.render_audible_alert(token, summary) {
                Ok(()) => events.push(Event::AudibleAlert {
                    token: token.to_string(),
                    at: now,
                }),
                Err(e) => {
                    tracing::warn!(token, error = %e, "failed to render audible alert");
                    alert_error = Some(e.to_string());
                }
            }
        } else {
            events.push(Event::AlertSuppressed {
                token: token.to_string(),
                at: now,
            });
        }

        Ok(MessageOutcome {
            token: token.to_string(),
            new_episode,
            audible,
            alert_error,
            events,
        })
    }

    /// The user read `token`. Returns the event if an unread episode ended.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be read or written.
    pub fn on_conversation_read(&self, token: &str) -> Result<Option<Event>, StoreError> {
        Ok(self
            .tracker
            .on_conversation_read(token)?
            .map(|reminders_issued| Event::ConversationRead {
                token: token.to_string(),
                reminders_issued,
            }))
    }

    pub fn settings(&self) -> NotificationsConfig {
        self.settings.current()
    }

    /// Replace the notification settings; takes effect on the next operation.
    pub fn update_settings(&self, config: NotificationsConfig) {
        self.settings.replace(config);
    }

    /// A scheduler sharing this engine's store, notifier and settings.
    ///
    /// Every scheduler handed out by one engine shares one scan lock, so
    /// their scans never overlap.
    pub fn scheduler(&self) -> RepeatScheduler {
        self.scheduler.clone()
    }

    pub fn tracker(&self) -> &UnreadTracker {
        &self.tracker
    }

    pub fn gate(&self) -> &DebounceGate {
        &self.gate
    }

    fn describe(&self, state: ConversationState) -> ConversationStatus {
        let policy = EscalationPolicy::from_config(&self.settings.current());
        ConversationStatus {
            next_reminder_at: policy.next_reminder_at(&state),
            reminders_remaining: policy.remaining(&state),
            state,
        }
    }

    /// Status of one conversation (default state if unknown).
    ///
    /// # Errors
    /// Returns an error if the state store cannot be read.
    pub fn status(&self, token: &str) -> Result<ConversationStatus, StoreError> {
        Ok(self.describe(self.store.get(token)?))
    }

    /// Status of every tracked conversation, ordered by token.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be read.
    pub fn status_all(&self) -> Result<Vec<ConversationStatus>, StoreError> {
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .map(|state| self.describe(state))
            .collect())
    }

    /// Forget everything about `token`. Returns whether it was tracked.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be written.
    pub fn clear(&self, token: &str) -> Result<bool, StoreError> {
        self.store.remove(token)
    }

    /// Forget every conversation. Returns how many were tracked.
    ///
    /// # Errors
    /// Returns an error if the state store cannot be written.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        self.store.clear_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{RecordingNotifier, Rendered};
    use crate::storage::MemoryStateStore;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn engine() -> (NotificationEngine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = NotificationEngine::new(
            Arc::new(MemoryStateStore::new()),
            notifier.clone(),
            NotificationsConfig::default(),
        );
        (engine, notifier)
    }

    #[test]
    fn first_message_is_audible_and_starts_episode() {
        let (engine, notifier) = engine();
        let outcome = engine.on_message_received("room", "hello", t0()).unwrap();

        assert!(outcome.new_episode);
        assert!(outcome.audible);
        assert_eq!(
            outcome.events,
            vec![
                Event::UnreadStarted {
                    token: "room".into(),
                    at: t0()
                },
                Event::AudibleAlert {
                    token: "room".into(),
                    at: t0()
                },
            ]
        );
        assert_eq!(
            notifier.calls(),
            vec![Rendered::AudibleAlert {
                token: "room".into(),
                summary: "hello".into()
            }]
        );
    }

    #[test]
    fn burst_message_is_suppressed() {
        let (engine, notifier) = engine();
        engine.on_message_received("room", "one", t0()).unwrap();
        let outcome = engine
            .on_message_received("room", "two", t0() + Duration::seconds(10))
            .unwrap();

        assert!(!outcome.new_episode);
        assert!(!outcome.audible);
        assert!(matches!(outcome.events[..], [Event::AlertSuppressed { .. }]));
        assert_eq!(notifier.calls().len(), 1);
    }

    #[test]
    fn alert_failure_is_reported_not_raised() {
        let (engine, notifier) = engine();
        notifier.fail_for("room");

        let outcome = engine.on_message_received("room", "hi", t0()).unwrap();
        assert!(outcome.audible);
        assert!(outcome.alert_error.is_some());
        assert!(engine.tracker().is_unread("room").unwrap());
    }

    #[test]
    fn read_emits_event_only_when_unread() {
        let (engine, _) = engine();
        assert!(engine.on_conversation_read("room").unwrap().is_none());

        engine.on_message_received("room", "hi", t0()).unwrap();
        assert_eq!(
            engine.on_conversation_read("room").unwrap(),
            Some(Event::ConversationRead {
                token: "room".into(),
                reminders_issued: 0
            })
        );
    }

    #[test]
    fn status_reports_next_reminder() {
        let (engine, _) = engine();
        engine.on_message_received("room", "hi", t0()).unwrap();

        let status = engine.status("room").unwrap();
        assert!(status.state.is_unread);
        assert_eq!(status.next_reminder_at, Some(t0() + Duration::minutes(5)));
        assert_eq!(status.reminders_remaining, 3);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["token"], "room");
        assert_eq!(json["reminders_remaining"], 3);
    }

    #[test]
    fn scheduler_shares_engine_settings() {
        let (engine, notifier) = engine();
        engine.on_message_received("room", "hi", t0()).unwrap();

        let mut config = engine.settings();
        config.max_repeats = 0;
        engine.update_settings(config);

        let report = engine.scheduler().scan(t0() + Duration::hours(1)).unwrap();
        assert_eq!(report.due, 0);
        assert_eq!(notifier.reminders().len(), 0);
    }

    #[test]
    fn schedulers_from_one_engine_share_scan_lock() {
        let (engine, notifier) = engine();
        let first = engine.scheduler();
        let second = engine.scheduler();
        assert!(first.shares_scan_lock(&second));
        assert!(first.shares_scan_lock(&engine.clone().scheduler()));

        engine.on_message_received("room", "hi", t0()).unwrap();
        let at = t0() + Duration::minutes(6);
        assert_eq!(first.scan(at).unwrap().reminded, 1);
        assert_eq!(second.scan(at).unwrap().reminded, 0);
        assert_eq!(notifier.reminders().len(), 1);
    }

    #[test]
    fn clear_forgets_conversations() {
        let (engine, _) = engine();
        engine.on_message_received("a", "hi", t0()).unwrap();
        engine.on_message_received("b", "hi", t0()).unwrap();

        assert!(engine.clear("a").unwrap());
        assert!(!engine.clear("a").unwrap());
        assert_eq!(engine.status_all().unwrap().len(), 1);
        assert_eq!(engine.clear_all().unwrap(), 1);
        assert!(engine.status_all().unwrap().is_empty());
    }
}
