//! SQLite connection and schema management.

use crate::core::error::MigrateError;
use crate::core::store::Store;
use rusqlite::Connection;
use std::fs;

/// Legacy per-type tables. Read-only once a migration begins.
pub const LEGACY_IMAGES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS images (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL UNIQUE,
    checksum BLOB NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
)";

pub const LEGACY_DOCUMENTS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL UNIQUE,
    checksum BLOB NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
)";

/// Unified polymorphic media table. `file_name` is unique across the whole
/// table, which is what enforces cross-type name uniqueness.
pub const UNIFIED_MEDIA_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY,
    file_name TEXT NOT NULL UNIQUE,
    checksum BLOB NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('image','document','video','audio')),
    width INTEGER,
    height INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
)";

/// Single-row-per-migration completion marker. Row presence is the sole
/// source of truth for "has this migration already run".
pub const MIGRATION_STATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS migration_state (
    migration_name TEXT PRIMARY KEY,
    completed_at TEXT NOT NULL
)";

pub fn db_connect(db_path: &str) -> Result<Connection, MigrateError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(MigrateError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(MigrateError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(MigrateError::RusqliteError)?;
    Ok(conn)
}

/// Open a connection to the store's live database.
pub fn connect(store: &Store) -> Result<Connection, MigrateError> {
    db_connect(store.db_path.to_string_lossy().as_ref())
}

/// Create the database with the legacy tables plus the upload directory
/// layout. Idempotent; used by `init` and by test fixtures.
pub fn initialize_store(store: &Store) -> Result<(), MigrateError> {
    if let Some(parent) = store.db_path.parent() {
        fs::create_dir_all(parent).map_err(MigrateError::IoError)?;
    }
    for dir in [store.images_dir(), store.docs_dir(), store.media_dir()] {
        fs::create_dir_all(&dir).map_err(MigrateError::IoError)?;
    }

    let conn = connect(store)?;
    conn.execute(LEGACY_IMAGES_SCHEMA, [])?;
    conn.execute(LEGACY_DOCUMENTS_SCHEMA, [])?;
    Ok(())
}

/// True iff `table` exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, MigrateError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
