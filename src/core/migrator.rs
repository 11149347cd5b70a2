//! Schema unification: copies the legacy `images` and `documents` tables into
//! the polymorphic `media` table, tagged by origin type.
//!
//! The migration is a linear, numbered state machine. Steps 2-4 run inside a
//! single SQL transaction, so an abort (duplicate name, I/O failure) leaves
//! zero partial unified rows and no completion marker. The marker row in
//! `migration_state` is the sole authority for "already migrated"; table
//! presence alone is never trusted.

use crate::core::db;
use crate::core::error::MigrateError;
use crate::core::lock::MigrationLock;
use crate::core::store::Store;
use crate::core::time;
use colored::Colorize;
use rusqlite::{params, Transaction};

/// Marker name under which completion is recorded.
pub const MIGRATION_NAME: &str = "unify_media_records";

pub struct SchemaMigrator {
    store: Store,
}

impl SchemaMigrator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// True iff the completion marker exists. A crash before the marker was
    /// written counts as "not completed".
    pub fn is_completed(&self) -> Result<bool, MigrateError> {
        let conn = db::connect(&self.store)?;
        if !db::table_exists(&conn, "migration_state")? {
            return Ok(false);
        }
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM migration_state WHERE migration_name = ?1",
            params![MIGRATION_NAME],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Run the unification. No-op if the marker already exists, which makes
    /// re-running safe.
    pub fn migrate(&self) -> Result<(), MigrateError> {
        if self.is_completed()? {
            println!(
                "  {} schema migration '{}' already completed, nothing to do",
                "✓".bright_green(),
                MIGRATION_NAME
            );
            return Ok(());
        }

        let _lock = MigrationLock::acquire(&self.store)?;
        let mut conn = db::connect(&self.store)?;

        step(1, "create unified media table");
        conn.execute(db::UNIFIED_MEDIA_SCHEMA, [])?;
        conn.execute(db::MIGRATION_STATE_SCHEMA, [])?;

        let tx = conn.transaction()?;

        step(2, "migrate image records");
        let images = copy_legacy_rows(&tx, "images", "image")?;

        step(3, "migrate document records");
        let documents = copy_legacy_rows(&tx, "documents", "document")?;

        step(4, "mark migration completed");
        tx.execute(
            "INSERT INTO migration_state (migration_name, completed_at) VALUES (?1, ?2)",
            params![MIGRATION_NAME, time::now_epoch_z()],
        )?;
        tx.commit()?;

        println!(
            "  {} unified {} image and {} document records",
            "✓".bright_green(),
            images,
            documents
        );
        Ok(())
    }

    /// Undo the unification: drop the unified table and delete the marker.
    /// Best-effort and idempotent; rolling back twice is safe.
    pub fn rollback(&self) -> Result<(), MigrateError> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let conn = db::connect(&self.store)?;

        if db::table_exists(&conn, "media")? {
            conn.execute("DELETE FROM media", [])?;
            conn.execute("DROP TABLE media", [])?;
            println!("  {} dropped unified media table", "✓".bright_green());
        }
        if db::table_exists(&conn, "migration_state")? {
            conn.execute(
                "DELETE FROM migration_state WHERE migration_name = ?1",
                params![MIGRATION_NAME],
            )?;
        }
        Ok(())
    }
}

fn step(n: u8, what: &str) {
    println!("  {} step {}: {}", "●".bright_cyan(), n, what);
}

/// Copy every row of `legacy_table` into `media` with the given type tag,
/// preserving id, name, checksum and timestamps. A unified row with the same
/// file name (any type) aborts with `DuplicateKey`.
fn copy_legacy_rows(
    tx: &Transaction,
    legacy_table: &str,
    type_tag: &str,
) -> Result<usize, MigrateError> {
    let mut select = tx.prepare(&format!(
        "SELECT id, file_name, checksum, created_at, updated_at, deleted_at
         FROM {legacy_table} ORDER BY file_name"
    ))?;
    let rows = select.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Vec<u8>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut copied = 0;
    for row in rows {
        let (id, file_name, checksum, created_at, updated_at, deleted_at) = row?;
        let clash: i64 = tx.query_row(
            "SELECT COUNT(*) FROM media WHERE file_name = ?1",
            params![file_name],
            |r| r.get(0),
        )?;
        if clash > 0 {
            return Err(MigrateError::DuplicateKey(file_name));
        }
        tx.execute(
            "INSERT INTO media (id, file_name, checksum, type, width, height, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6, ?7)",
            params![id, file_name, checksum, type_tag, created_at, updated_at, deleted_at],
        )?;
        copied += 1;
    }
    Ok(copied)
}
