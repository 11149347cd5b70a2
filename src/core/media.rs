//! Unified media records and the repository capability set.
//!
//! The legacy system exposed separate image and document accessors. Here a
//! single `MediaRepo` implements the whole capability set against the unified
//! table, parameterized over a `MediaType` tag; thin adapter functions (not
//! separate repository types) provide the legacy-shaped views.

use crate::core::error::MigrateError;
use crate::core::time;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Type discriminator for unified media records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Document,
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Document => "document",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MigrateError> {
        match s {
            "image" => Ok(MediaType::Image),
            "document" => Ok(MediaType::Document),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            other => Err(MigrateError::Validation(format!(
                "unknown media type '{other}'"
            ))),
        }
    }
}

/// One row of the unified `media` table.
///
/// Width/height carry values only for `Image` records. `deleted_at` is the
/// soft-delete marker inherited from the legacy shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    pub file_name: String,
    #[serde(with = "serde_bytes_hex")]
    pub checksum: Vec<u8>,
    pub media_type: MediaType,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Hex round-trip for checksum bytes so JSON reports stay readable.
mod serde_bytes_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        ser.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(de)?;
        if hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length hex checksum"));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Fields for a record created through the repository (not migrated).
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub file_name: String,
    pub checksum: Vec<u8>,
    pub media_type: MediaType,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

const SELECT_COLS: &str =
    "id, file_name, checksum, type, width, height, created_at, updated_at, deleted_at";

fn row_to_record(row: &Row) -> rusqlite::Result<MediaRecord> {
    let type_str: String = row.get(3)?;
    let media_type = MediaType::parse(&type_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MediaRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        checksum: row.get(2)?,
        media_type,
        width: row.get(4)?,
        height: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

/// Repository over the unified table. Borrows an open connection; callers own
/// connection lifecycle and locking.
pub struct MediaRepo<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MediaRepo<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get(
        &self,
        id: &str,
        tag: Option<MediaType>,
    ) -> Result<Option<MediaRecord>, MigrateError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM media WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(filter_tag(record, tag))
    }

    pub fn get_by_checksum(
        &self,
        checksum: &[u8],
        tag: Option<MediaType>,
    ) -> Result<Option<MediaRecord>, MigrateError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM media WHERE checksum = ?1"),
                params![checksum],
                row_to_record,
            )
            .optional()?;
        Ok(filter_tag(record, tag))
    }

    pub fn get_by_name(
        &self,
        file_name: &str,
        tag: Option<MediaType>,
    ) -> Result<Option<MediaRecord>, MigrateError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLS} FROM media WHERE file_name = ?1"),
                params![file_name],
                row_to_record,
            )
            .optional()?;
        Ok(filter_tag(record, tag))
    }

    pub fn get_by_type(&self, tag: MediaType) -> Result<Vec<MediaRecord>, MigrateError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLS} FROM media WHERE type = ?1 ORDER BY file_name"
        ))?;
        let rows = stmt.query_map(params![tag.as_str()], row_to_record)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Insert a new record with a fresh ulid id. Name uniqueness is checked
    /// across all types before insertion; width/height are only legal for
    /// images.
    pub fn add(&self, new: NewMedia) -> Result<MediaRecord, MigrateError> {
        if new.media_type != MediaType::Image && (new.width.is_some() || new.height.is_some()) {
            return Err(MigrateError::Validation(format!(
                "width/height only apply to images, got type '{}'",
                new.media_type.as_str()
            )));
        }
        if self.get_by_name(&new.file_name, None)?.is_some() {
            return Err(MigrateError::DuplicateKey(new.file_name));
        }
        let now = time::now_epoch_z();
        let record = MediaRecord {
            id: Ulid::new().to_string(),
            file_name: new.file_name,
            checksum: new.checksum,
            media_type: new.media_type,
            width: new.width,
            height: new.height,
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        };
        self.conn.execute(
            "INSERT INTO media (id, file_name, checksum, type, width, height, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
            params![
                record.id,
                record.file_name,
                record.checksum,
                record.media_type.as_str(),
                record.width,
                record.height,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    /// Soft delete: stamps `deleted_at`, keeps the row.
    pub fn delete(&self, id: &str) -> Result<(), MigrateError> {
        let changed = self.conn.execute(
            "UPDATE media SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![time::now_epoch_z(), id],
        )?;
        if changed == 0 {
            return Err(MigrateError::NotFound(format!("media record '{id}'")));
        }
        Ok(())
    }

    pub fn rename(&self, id: &str, new_name: &str) -> Result<(), MigrateError> {
        if let Some(existing) = self.get_by_name(new_name, None)? {
            if existing.id != id {
                return Err(MigrateError::DuplicateKey(new_name.to_string()));
            }
        }
        let changed = self.conn.execute(
            "UPDATE media SET file_name = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_name, time::now_epoch_z(), id],
        )?;
        if changed == 0 {
            return Err(MigrateError::NotFound(format!("media record '{id}'")));
        }
        Ok(())
    }
}

fn filter_tag(record: Option<MediaRecord>, tag: Option<MediaType>) -> Option<MediaRecord> {
    match (record, tag) {
        (Some(r), Some(t)) if r.media_type != t => None,
        (r, _) => r,
    }
}

// Legacy-shaped views: the old per-type accessors, as adapter functions over
// the single repository.

pub fn image_by_name(
    repo: &MediaRepo,
    file_name: &str,
) -> Result<Option<MediaRecord>, MigrateError> {
    repo.get_by_name(file_name, Some(MediaType::Image))
}

pub fn document_by_name(
    repo: &MediaRepo,
    file_name: &str,
) -> Result<Option<MediaRecord>, MigrateError> {
    repo.get_by_name(file_name, Some(MediaType::Document))
}

pub fn all_images(repo: &MediaRepo) -> Result<Vec<MediaRecord>, MigrateError> {
    repo.get_by_type(MediaType::Image)
}

pub fn all_documents(repo: &MediaRepo) -> Result<Vec<MediaRecord>, MigrateError> {
    repo.get_by_type(MediaType::Document)
}
