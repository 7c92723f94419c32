//! Unread tracking.
//!
//! Records read/unread transitions per conversation. Every mutating call is
//! written through to the state store before it returns.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::storage::StateStore;

/// Tracks unread episodes for every conversation.
#[derive(Clone)]
pub struct UnreadTracker {
    store: Arc<dyn StateStore>,
}

impl UnreadTracker {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// A message arrived for `token` at `now`.
    ///
    /// Starts a new unread episode if the conversation was read, resetting
    /// the reminder count. Returns whether an episode started.
    pub fn on_message_received(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut started = false;
        self.store.update(token, &mut |state| {
            started = state.mark_unread(now);
        })?;
        if started {
            tracing::debug!(token, "unread episode started");
        }
        Ok(started)
    }

    /// The user read `token`.
    ///
    /// Returns the number of reminders issued during the episode that just
    /// ended, or `None` if the conversation was not unread. A token that was
    /// never seen stays absent from the store.
    pub fn on_conversation_read(&self, token: &str) -> Result<Option<u32>, StoreError> {
        if !self.store.get(token)?.is_unread {
            return Ok(None);
        }

        let mut ended = None;
        self.store.update(token, &mut |state| {
            let issued = state.repeat_count;
            if state.mark_read() {
                ended = Some(issued);
            }
        })?;
        if let Some(issued) = ended {
            tracing::debug!(token, reminders_issued = issued, "unread episode ended");
        }
        Ok(ended)
    }

    pub fn is_unread(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(token)?.is_unread)
    }

    pub fn unread_since(&self, token: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.store.get(token)?.unread_since)
    }
}
