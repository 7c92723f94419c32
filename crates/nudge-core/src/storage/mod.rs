mod config;
mod memory;
pub mod migrations;
pub mod state_db;

pub use config::{Config, EscalationAnchor, NotificationsConfig, SchedulerConfig};
pub use memory::MemoryStateStore;
pub use state_db::SqliteStateStore;

use std::path::PathBuf;

use crate::conversation::ConversationState;
use crate::error::{ConfigError, StoreError};

/// Durable mapping from conversation token to [`ConversationState`].
///
/// Every method must be safe to call concurrently. Each conversation is
/// independent; there are no cross-key guarantees.
pub trait StateStore: Send + Sync {
    /// Current state for `token`, or a default record if none is stored.
    fn get(&self, token: &str) -> Result<ConversationState, StoreError>;

    /// Insert or replace the record for `state.token`.
    fn put(&self, state: &ConversationState) -> Result<(), StoreError>;

    /// Atomically read, modify and write back one record.
    ///
    /// `apply` sees the current state (default if absent) and mutates it in
    /// place. No other caller can observe or change the record between the
    /// read and the write. Returns the state as written.
    fn update(
        &self,
        token: &str,
        apply: &mut dyn FnMut(&mut ConversationState),
    ) -> Result<ConversationState, StoreError>;

    /// Snapshot of every stored record, ordered by token.
    ///
    /// Each call takes a fresh snapshot; later writes are not reflected in a
    /// snapshot already returned.
    fn list_all(&self) -> Result<Vec<ConversationState>, StoreError>;

    /// Delete the record for `token`. Returns whether one existed.
    fn remove(&self, token: &str) -> Result<bool, StoreError>;

    /// Delete every record. Returns how many were removed.
    fn clear_all(&self) -> Result<usize, StoreError>;
}

/// Returns the nudge data directory, creating it if needed.
///
/// Resolution order: `NUDGE_DATA_DIR` if set, otherwise
/// `~/.config/nudge-dev/` when `NUDGE_ENV=dev`, otherwise `~/.config/nudge/`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("NUDGE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("NUDGE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("nudge-dev")
            } else {
                base_dir.join("nudge")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
