//! Schema migrations for the conversation state database.
//!
//! Migrations are versioned and applied automatically when the store is
//! opened. The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// Pending migrations run in one transaction; a failure leaves the database
/// at its previous version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    create_schema_version_table(&tx)?;

    let current_version = get_schema_version(&tx)?;

    if current_version < 1 {
        migrate_v1(&tx)?;
    }

    tx.commit()
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: one row per conversation with unread, escalation and debounce state.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            token                     TEXT PRIMARY KEY,
            is_unread                 INTEGER NOT NULL DEFAULT 0,
            unread_since_ms           INTEGER,
            repeat_count              INTEGER NOT NULL DEFAULT 0,
            last_reminder_at_ms       INTEGER,
            last_audible_signal_at_ms INTEGER,
            updated_at                TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_is_unread ON conversations(is_unread);",
    )?;
    set_schema_version(conn, 1)
}
