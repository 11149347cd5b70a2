//! Read-only certification of a completed unification.
//!
//! Compares record counts between the legacy and unified views and
//! spot-checks a bounded random sample of unified records against their
//! legacy counterpart's checksum. Never mutates state and never takes the
//! advisory lock; mismatches are reported, not raised.

use crate::core::db;
use crate::core::error::MigrateError;
use crate::core::store::Store;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Upper bound on spot-checked records per run.
const SAMPLE_LIMIT: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub unified_count: i64,
    pub legacy_image_count: i64,
    pub legacy_document_count: i64,
    /// How many unified records were spot-checked.
    pub sampled: usize,
    /// File names whose legacy counterpart is missing or whose checksum
    /// disagrees byte-for-byte.
    pub mismatched: Vec<String>,
    pub ok: bool,
}

pub struct Verifier {
    store: Store,
}

impl Verifier {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn verify(&self) -> Result<VerifyReport, MigrateError> {
        let conn = db::connect(&self.store)?;

        let legacy_image_count = count(&conn, "images")?;
        let legacy_document_count = count(&conn, "documents")?;
        let unified_count = if db::table_exists(&conn, "media")? {
            count(&conn, "media")?
        } else {
            0
        };

        let mut mismatched = Vec::new();
        let mut sampled = 0;
        if unified_count > 0 {
            let mut stmt = conn.prepare(
                "SELECT file_name, checksum, type FROM media
                 WHERE type IN ('image','document')
                 ORDER BY RANDOM() LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![SAMPLE_LIMIT as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (file_name, checksum, type_tag) = row?;
                sampled += 1;
                let legacy_table = if type_tag == "image" { "images" } else { "documents" };
                let legacy: Option<Vec<u8>> = conn
                    .query_row(
                        &format!("SELECT checksum FROM {legacy_table} WHERE file_name = ?1"),
                        params![file_name],
                        |r| r.get(0),
                    )
                    .optional()?;
                match legacy {
                    Some(bytes) if bytes == checksum => {}
                    _ => mismatched.push(file_name),
                }
            }
        }

        let ok = unified_count == legacy_image_count + legacy_document_count
            && mismatched.is_empty();
        Ok(VerifyReport {
            unified_count,
            legacy_image_count,
            legacy_document_count,
            sampled,
            mismatched,
            ok,
        })
    }
}

fn count(conn: &Connection, table: &str) -> Result<i64, MigrateError> {
    if !db::table_exists(conn, table)? {
        return Ok(0);
    }
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(n)
}
