//! # Nudge Core Library
//!
//! This library decides when a chat application should make noise about
//! incoming messages. It never renders anything itself; rendering is left to
//! a [`Notifier`] supplied by the platform.
//!
//! ## Architecture
//!
//! - **State Store**: durable per-conversation state (SQLite) behind the
//!   [`StateStore`] trait
//! - **Unread Tracker**: read/unread episodes per conversation
//! - **Debounce Gate**: sliding-window suppression of sounds for message bursts
//! - **Escalation Policy**: pure "is a reminder due" decision
//! - **Repeat Scheduler**: periodic scan that issues bounded reminders
//!
//! ## Key Components
//!
//! - [`NotificationEngine`]: entry point wiring all of the above
//! - [`SqliteStateStore`]: durable state store
//! - [`Config`]: TOML configuration with defaults for every key
//! - [`Notifier`]: trait implemented by rendering backends

pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod notifier;
pub mod storage;

pub use conversation::{reminder_key, ConversationState};
pub use engine::{
    due_for_reminder, ConversationStatus, DebounceGate, EscalationPolicy, MessageOutcome,
    NotificationEngine, RepeatScheduler, ScanReport, SchedulerHandle, Settings, UnreadTracker,
};
pub use error::{ConfigError, CoreError, NotifierError, StoreError};
pub use events::Event;
pub use notifier::{LogNotifier, Notifier, RecordingNotifier};
pub use storage::{
    Config, EscalationAnchor, MemoryStateStore, NotificationsConfig, SchedulerConfig,
    SqliteStateStore, StateStore,
};
