//! Debounce gate for audible alerts.
//!
//! Within a burst of messages for one conversation only the first should make
//! a sound. The window slides: every message, audible or not, restarts it, so
//! a steady trickle of messages stays silent until a gap longer than the
//! grouping timeout occurs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::Settings;
use crate::error::StoreError;
use crate::storage::StateStore;

/// Audibility decision for one event, given the previous window anchor.
///
/// `None` (never signalled) is always audible. The boundary is strict: a gap
/// exactly equal to the timeout is still inside the window.
pub fn is_audible(
    last_signal_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    smart_grouping_enabled: bool,
    grouping_timeout: Duration,
) -> bool {
    if !smart_grouping_enabled {
        return true;
    }
    match last_signal_at {
        None => true,
        Some(last) => now - last > grouping_timeout,
    }
}

/// Per-conversation sliding-window debounce.
#[derive(Clone)]
pub struct DebounceGate {
    store: Arc<dyn StateStore>,
    settings: Settings,
}

impl DebounceGate {
    pub fn new(store: Arc<dyn StateStore>, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Decide whether the message event for `token` at `now` should be audible,
    /// and advance the window to `now` regardless of the answer.
    pub fn should_signal(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let config = self.settings.current();
        let timeout = config.grouping_timeout();

        let mut audible = false;
        let mut previous = None;
        self.store.update(token, &mut |state| {
            previous = state.last_audible_signal_at;
            audible = is_audible(previous, now, config.smart_grouping_enabled, timeout);
            state.last_audible_signal_at = Some(now);
        })?;

        tracing::debug!(
            token,
            audible,
            since_last_ms = previous.map(|last| (now - last).num_milliseconds()),
            timeout_ms = timeout.num_milliseconds(),
            "smart grouping decision"
        );
        Ok(audible)
    }
}
