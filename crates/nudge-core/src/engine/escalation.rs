//! Escalation policy for unread conversations.
//!
//! Decides whether a conversation that is still unread deserves another
//! reminder. The policy is a pure function of the stored state and the
//! current time; committing the decision is the scheduler's job.
//!
//! ## Anchors
//!
//! - **Episode start**: the interval is always measured from `unread_since`.
//!   Once the first reminder is due, every scan at a later instant in the
//!   same episode is due as well until `max_repeats` is reached.
//! - **Last reminder** (default): the interval is measured from the last
//!   committed reminder, so reminders are spaced one interval apart.

use chrono::{DateTime, Duration, Utc};

use crate::conversation::ConversationState;
use crate::storage::{EscalationAnchor, NotificationsConfig};

/// Reminder thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub repeat_interval: Duration,
    pub max_repeats: u32,
    pub anchor: EscalationAnchor,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&NotificationsConfig::default())
    }
}

impl EscalationPolicy {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            repeat_interval: config.repeat_interval(),
            max_repeats: config.max_repeats,
            anchor: config.escalation_anchor,
        }
    }

    /// Instant the repeat interval is measured from, if the conversation is in an episode.
    pub fn anchor_time(&self, state: &ConversationState) -> Option<DateTime<Utc>> {
        let since = state.unread_since?;
        match self.anchor {
            EscalationAnchor::EpisodeStart => Some(since),
            EscalationAnchor::LastReminder => Some(state.last_reminder_at.unwrap_or(since)),
        }
    }

    /// Whether another reminder may still be issued in this episode.
    pub fn has_budget(&self, state: &ConversationState) -> bool {
        state.repeat_count < self.max_repeats
    }

    /// True iff a reminder should be issued for `state` at `now`.
    ///
    /// A reminder committed at or after `now` makes the conversation not due,
    /// whatever the anchor, so rescanning one instant never counts twice.
    pub fn due_for_reminder(&self, state: &ConversationState, now: DateTime<Utc>) -> bool {
        if !state.is_unread || !self.has_budget(state) {
            return false;
        }
        if state.last_reminder_at.is_some_and(|at| at >= now) {
            return false;
        }
        match self.anchor_time(state) {
            Some(anchor) => now - anchor > self.repeat_interval,
            None => false,
        }
    }

    /// Earliest instant after which the conversation becomes due, or `None`
    /// when no further reminder will be issued this episode.
    ///
    /// The comparison is strict, so the conversation is due at any instant
    /// *after* the returned one, not at it.
    pub fn next_reminder_at(&self, state: &ConversationState) -> Option<DateTime<Utc>> {
        if !state.is_unread || !self.has_budget(state) {
            return None;
        }
        self.anchor_time(state).map(|anchor| anchor + self.repeat_interval)
    }

    /// Reminders left in the current episode.
    pub fn remaining(&self, state: &ConversationState) -> u32 {
        if !state.is_unread {
            return 0;
        }
        self.max_repeats.saturating_sub(state.repeat_count)
    }
}

/// Free-function form of [`EscalationPolicy::due_for_reminder`].
pub fn due_for_reminder(
    state: &ConversationState,
    now: DateTime<Utc>,
    policy: &EscalationPolicy,
) -> bool {
    policy.due_for_reminder(state, now)
}
