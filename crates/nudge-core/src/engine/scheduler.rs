//! Repeat scheduler.
//!
//! A periodic scan over every tracked conversation. For each one the
//! escalation policy deems due, the notifier renders a reminder and the
//! incremented count is committed. The scan itself has no timer; [`run`]
//! and [`spawn`] drive it from a `tokio` interval.
//!
//! [`run`]: RepeatScheduler::run
//! [`spawn`]: RepeatScheduler::spawn

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::escalation::EscalationPolicy;
use super::Settings;
use crate::conversation::ConversationState;
use crate::error::StoreError;
use crate::events::Event;
use crate::notifier::Notifier;
use crate::storage::StateStore;

/// Outcome of one scan pass.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub at: DateTime<Utc>,
    /// Conversations in the snapshot.
    pub scanned: usize,
    /// Conversations the policy found due in the snapshot.
    pub due: usize,
    /// Reminders rendered and committed.
    pub reminded: usize,
    /// Reminders that failed to render or commit.
    pub failed: usize,
    /// True when repeat notifications were disabled and nothing was scanned.
    pub skipped_disabled: bool,
    pub events: Vec<Event>,
}

impl ScanReport {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            scanned: 0,
            due: 0,
            reminded: 0,
            failed: 0,
            skipped_disabled: false,
            events: Vec::new(),
        }
    }
}

/// What happened to one due conversation.
enum Reminder {
    Issued(u32),
    /// The live record no longer qualifies (read, or handled meanwhile).
    Stale,
    Failed { repeat_count: u32, error: String },
}

/// Periodic reminder scan over the state store.
///
/// Clones share the same store, notifier, settings and scan lock, so at most
/// one scan runs at a time across all of them.
#[derive(Clone)]
pub struct RepeatScheduler {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    scan_lock: Arc<Mutex<()>>,
}

impl RepeatScheduler {
    pub fn new(store: Arc<dyn StateStore>, notifier: Arc<dyn Notifier>, settings: Settings) -> Self {
        Self {
            store,
            notifier,
            settings,
            scan_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run one scan at `now`.
    ///
    /// A failure for one conversation is logged, reported and skipped; the
    /// rest of the snapshot is still processed.
    ///
    /// # Errors
    /// Returns an error only if the snapshot itself cannot be read.
    pub fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport, StoreError> {
        let _guard = self.scan_lock.lock()?;
        let config = self.settings.current();
        let mut report = ScanReport::new(now);

        if !config.repeat_notifications_enabled {
            tracing::debug!("repeat notifications disabled");
            report.skipped_disabled = true;
            report.events.push(Event::ScanSkipped { at: now });
            return Ok(report);
        }

        let policy = EscalationPolicy::from_config(&config);
        let snapshot = self.store.list_all()?;
        report.scanned = snapshot.len();

        for state in snapshot
            .iter()
            .filter(|state| policy.due_for_reminder(state, now))
        {
            report.due += 1;
            match self.remind(state, &policy, now) {
                Reminder::Issued(repeat_count) => {
                    report.reminded += 1;
                    report.events.push(Event::ReminderIssued {
                        token: state.token.clone(),
                        repeat_count,
                        at: now,
                    });
                }
                Reminder::Stale => {}
                Reminder::Failed {
                    repeat_count,
                    error,
                } => {
                    report.failed += 1;
                    report.events.push(Event::ReminderFailed {
                        token: state.token.clone(),
                        repeat_count,
                        error,
                        at: now,
                    });
                }
            }
        }

        tracing::debug!(
            scanned = report.scanned,
            due = report.due,
            reminded = report.reminded,
            failed = report.failed,
            "reminder scan finished"
        );
        Ok(report)
    }

    fn remind(
        &self,
        snapshot: &ConversationState,
        policy: &EscalationPolicy,
        now: DateTime<Utc>,
    ) -> Reminder {
        let token = snapshot.token.as_str();

        // the snapshot may be stale; decide on the live record
        let live = match self.store.get(token) {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(token, error = %e, "failed to read conversation state");
                return Reminder::Failed {
                    repeat_count: snapshot.repeat_count + 1,
                    error: e.to_string(),
                };
            }
        };
        if !policy.due_for_reminder(&live, now) {
            return Reminder::Stale;
        }

        let repeat_count = live.repeat_count + 1;
        if let Err(e) = self.notifier.render(token, repeat_count) {
            tracing::warn!(token, repeat_count, error = %e, "failed to render reminder");
            return Reminder::Failed {
                repeat_count,
                error: e.to_string(),
            };
        }

        // commit only if nobody touched the episode since we read it
        let mut committed = false;
        let result = self.store.update(token, &mut |state| {
            if state.is_unread
                && state.unread_since == live.unread_since
                && state.repeat_count == live.repeat_count
            {
                state.record_reminder(now);
                committed = true;
            }
        });
        match result {
            Ok(_) if committed => {
                tracing::info!(token, repeat_count, "sent repeat notification");
                Reminder::Issued(repeat_count)
            }
            Ok(_) => {
                tracing::debug!(token, "conversation changed during reminder, count not committed");
                Reminder::Stale
            }
            Err(e) => {
                tracing::warn!(token, repeat_count, error = %e, "failed to commit reminder");
                Reminder::Failed {
                    repeat_count,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Scan every `period` until `shutdown` turns true or its sender is dropped.
    ///
    /// The first scan runs immediately. Missed ticks are skipped rather than
    /// replayed in a burst.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(period_secs = period.as_secs_f64(), "repeat scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // scan is synchronous and may wait out the store's busy timeout
                    let scheduler = self.clone();
                    match tokio::task::spawn_blocking(move || scheduler.scan(Utc::now())).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(error)) => tracing::warn!(%error, "reminder scan failed"),
                        Err(error) => tracing::error!(%error, "reminder scan task panicked"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("repeat scheduler stopped");
    }

    #[cfg(test)]
    pub(super) fn shares_scan_lock(&self, other: &RepeatScheduler) -> bool {
        Arc::ptr_eq(&self.scan_lock, &other.scan_lock)
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(&self, period: Duration) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = self.clone();
        let task = tokio::spawn(async move {
            scheduler.run(period, shutdown_rx).await;
        });
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a spawned scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to stop after its current scan.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(self) -> Result<(), tokio::task::JoinError> {
        self.shutdown();
        self.task.await
    }
}
