//! Schema migrations for the hit store.
//!
//! Migrations run in order and are tracked in the `migrations` table.

use crate::QueueResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> QueueResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Hit store schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running hit store migrations");

    if current_version < 1 {
        migrate_v1_hits(conn)?;
    }
    if current_version < 2 {
        migrate_v2_unique_id_index(conn)?;
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> QueueResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: hits table. `id` is the insertion order.
fn migrate_v1_hits(conn: &Connection) -> QueueResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS hits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unique_id TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            data BLOB
        );
        ",
    )?;
    record_migration(conn, 1, "hits")
}

/// V2: lookup index for remove-by-id.
fn migrate_v2_unique_id_index(conn: &Connection) -> QueueResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_hits_unique_id ON hits(unique_id);",
    )?;
    record_migration(conn, 2, "hits_unique_id_index")
}
