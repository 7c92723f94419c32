//! SQLite-backed conversation state store.
//!
//! One row per conversation token. Timestamps are stored as epoch
//! milliseconds, `NULL` meaning unset. Every write goes straight to disk
//! before the call returns, so a crash right after an event cannot lose
//! the transition.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{data_dir, migrations, StateStore};
use crate::conversation::ConversationState;
use crate::error::{CoreError, StoreError};

const SELECT_COLUMNS: &str = "token, is_unread, unread_since_ms, repeat_count, \
     last_reminder_at_ms, last_audible_signal_at_ms";

/// Durable [`StateStore`] on a single SQLite connection.
///
/// The connection sits behind a mutex; `update` additionally runs inside an
/// immediate transaction so a second process sharing the file cannot
/// interleave with the read-modify-write.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open the store at `<data_dir>/nudge.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened
    /// or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("nudge.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (creating if needed) the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        tracing::debug!(path = %path.display(), "opened conversation state store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<ConversationState> {
        Ok(ConversationState {
            token: row.get(0)?,
            is_unread: row.get(1)?,
            unread_since: row.get::<_, Option<i64>>(2)?.and_then(from_epoch_ms),
            repeat_count: row.get(3)?,
            last_reminder_at: row.get::<_, Option<i64>>(4)?.and_then(from_epoch_ms),
            last_audible_signal_at: row.get::<_, Option<i64>>(5)?.and_then(from_epoch_ms),
        })
    }

    fn select(conn: &Connection, token: &str) -> rusqlite::Result<Option<ConversationState>> {
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM conversations WHERE token = ?1"),
            params![token],
            Self::read_row,
        )
        .optional()
    }

    fn upsert(conn: &Connection, state: &ConversationState) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO conversations
                (token, is_unread, unread_since_ms, repeat_count,
                 last_reminder_at_ms, last_audible_signal_at_ms, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(token) DO UPDATE SET
                is_unread = excluded.is_unread,
                unread_since_ms = excluded.unread_since_ms,
                repeat_count = excluded.repeat_count,
                last_reminder_at_ms = excluded.last_reminder_at_ms,
                last_audible_signal_at_ms = excluded.last_audible_signal_at_ms,
                updated_at = excluded.updated_at",
            params![
                state.token,
                state.is_unread,
                state.unread_since.map(|t| t.timestamp_millis()),
                state.repeat_count,
                state.last_reminder_at.map(|t| t.timestamp_millis()),
                state.last_audible_signal_at.map(|t| t.timestamp_millis()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

/// Only `NULL` means unset; zero and negative values are real instants.
fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

impl StateStore for SqliteStateStore {
    fn get(&self, token: &str) -> Result<ConversationState, StoreError> {
        let conn = self.conn.lock()?;
        Ok(Self::select(&conn, token)?.unwrap_or_else(|| ConversationState::new(token)))
    }

    fn put(&self, state: &ConversationState) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        Self::upsert(&conn, state)?;
        Ok(())
    }

    fn update(
        &self,
        token: &str,
        apply: &mut dyn FnMut(&mut ConversationState),
    ) -> Result<ConversationState, StoreError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut state = Self::select(&tx, token)?.unwrap_or_else(|| ConversationState::new(token));
        apply(&mut state);
        // the token is the key; a closure must not move the record
        state.token = token.to_string();
        Self::upsert(&tx, &state)?;
        tx.commit()?;
        Ok(state)
    }

    fn list_all(&self) -> Result<Vec<ConversationState>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM conversations ORDER BY token"
        ))?;
        let rows = stmt.query_map([], Self::read_row)?;
        let mut states = Vec::new();
        for row in rows {
            states.push(row?);
        }
        Ok(states)
    }

    fn remove(&self, token: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock()?;
        let removed = conn.execute("DELETE FROM conversations WHERE token = ?1", params![token])?;
        Ok(removed > 0)
    }

    fn clear_all(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock()?;
        Ok(conn.execute("DELETE FROM conversations", [])?)
    }
}
