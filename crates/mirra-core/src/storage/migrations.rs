//! Database migrations

use rusqlite::Connection;

use super::db::StorageError;

const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
///
/// # Errors
/// Returns an error if migrations fail
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    conn.pragma_update(None, "user_version", CURRENT_VERSION)?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r"
        -- Managed account profiles
        -- Stores the full profile record as JSON blob in data column
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Mirror bindings: each mirror follows exactly one master
        CREATE TABLE IF NOT EXISTS bindings (
            mirror_id TEXT PRIMARY KEY,
            master_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Protected addons per mirror
        CREATE TABLE IF NOT EXISTS protected_addons (
            mirror_id TEXT NOT NULL,
            transport_url TEXT NOT NULL,
            occurrence INTEGER NOT NULL,
            PRIMARY KEY (mirror_id, transport_url, occurrence)
        );

        -- Collection snapshots
        -- Stores the captured collection as JSON blob in data column
        CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL,
            description TEXT NOT NULL,
            data TEXT NOT NULL,
            checksum TEXT NOT NULL,
            addon_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_bindings_master ON bindings(master_id);
        CREATE INDEX IF NOT EXISTS idx_snapshots_profile ON snapshots(profile_id);
        ",
    )?;

    Ok(())
}
