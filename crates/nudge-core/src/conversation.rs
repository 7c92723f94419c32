//! Per-conversation engine state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine state for one conversation, keyed by its opaque token.
///
/// A fresh record (never seen before) is read, not unread, and has never
/// produced a signal. Records are created lazily the first time a message
/// arrives for a token and are kept after the conversation is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub token: String,
    pub is_unread: bool,
    /// Start of the current unread episode; `None` exactly when read.
    #[serde(default)]
    pub unread_since: Option<DateTime<Utc>>,
    /// Reminders already issued in the current unread episode.
    #[serde(default)]
    pub repeat_count: u32,
    /// When the most recent reminder of this episode was committed.
    #[serde(default)]
    pub last_reminder_at: Option<DateTime<Utc>>,
    /// Anchor of the debounce window. Advanced by every message event,
    /// audible or not.
    #[serde(default)]
    pub last_audible_signal_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    /// Default record for a token that has no stored state.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            is_unread: false,
            unread_since: None,
            repeat_count: 0,
            last_reminder_at: None,
            last_audible_signal_at: None,
        }
    }

    /// Begin a new unread episode at `now`.
    ///
    /// Returns `false` without touching anything when an episode is already
    /// running; only the first message of an episode starts the clock.
    pub fn mark_unread(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_unread {
            return false;
        }
        self.is_unread = true;
        self.unread_since = Some(now);
        self.repeat_count = 0;
        self.last_reminder_at = None;
        true
    }

    /// End the current unread episode. Returns whether it was unread.
    pub fn mark_read(&mut self) -> bool {
        let was_unread = self.is_unread;
        self.is_unread = false;
        self.unread_since = None;
        self.repeat_count = 0;
        self.last_reminder_at = None;
        was_unread
    }

    /// Record a reminder committed at `now`.
    pub fn record_reminder(&mut self, now: DateTime<Utc>) {
        self.repeat_count = self.repeat_count.saturating_add(1);
        self.last_reminder_at = Some(now);
    }
}

/// Stable notification key for reminders of a conversation, so a renderer
/// replaces the previous reminder instead of stacking a new one.
pub fn reminder_key(token: &str) -> String {
    format!("repeat_{}", token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn new_record_is_read_and_silent() {
        let state = ConversationState::new("room-1");
        assert_eq!(state.token, "room-1");
        assert!(!state.is_unread);
        assert!(state.unread_since.is_none());
        assert_eq!(state.repeat_count, 0);
        assert!(state.last_audible_signal_at.is_none());
    }

    #[test]
    fn mark_unread_starts_episode_once() {
        let mut state = ConversationState::new("room-1");
        assert!(state.mark_unread(t0()));
        assert_eq!(state.unread_since, Some(t0()));

        // second message keeps the original clock
        assert!(!state.mark_unread(t0() + Duration::minutes(2)));
        assert_eq!(state.unread_since, Some(t0()));
    }

    #[test]
    fn new_episode_resets_repeat_count() {
        let mut state = ConversationState::new("room-1");
        state.mark_unread(t0());
        state.record_reminder(t0() + Duration::minutes(6));
        state.record_reminder(t0() + Duration::minutes(12));
        assert_eq!(state.repeat_count, 2);

        state.mark_read();
        state.mark_unread(t0() + Duration::hours(1));
        assert_eq!(state.repeat_count, 0);
        assert!(state.last_reminder_at.is_none());
        assert_eq!(state.unread_since, Some(t0() + Duration::hours(1)));
    }

    #[test]
    fn mark_read_clears_episode() {
        let mut state = ConversationState::new("room-1");
        state.mark_unread(t0());
        state.record_reminder(t0() + Duration::minutes(6));

        assert!(state.mark_read());
        assert!(!state.is_unread);
        assert!(state.unread_since.is_none());
        assert_eq!(state.repeat_count, 0);
        assert!(!state.mark_read());
    }

    #[test]
    fn test_reminder_key() {
        assert_eq!(reminder_key("abc123"), "repeat_abc123");
    }
}
