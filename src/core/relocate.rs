//! File relocation between the legacy per-type upload directories and the
//! unified media directory.
//!
//! `migrate()` copies, never moves: legacy files stay in place until the
//! operator explicitly runs `cleanup()`. Because the legacy copies survive,
//! the relocation log can be derived from the directory listings and
//! `rollback()` is a pure deletion in the unified directory.

use crate::core::error::MigrateError;
use crate::core::lock::MigrationLock;
use crate::core::media::MediaType;
use crate::core::store::Store;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// One file's relocation, derived per run. `moved` is false when the
/// destination already held an identical copy (idempotent re-run).
#[derive(Debug, Clone, Serialize)]
pub struct RelocationEntry {
    pub file_name: String,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub media_type: MediaType,
    pub moved: bool,
}

pub struct FileRelocator {
    store: Store,
}

impl FileRelocator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Copy every legacy file into the unified directory, verifying content
    /// integrity on both sides of each copy. A checksum mismatch aborts the
    /// whole relocation with `Corruption`. Legacy sources are left in place.
    pub fn migrate(&self) -> Result<Vec<RelocationEntry>, MigrateError> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let media_dir = self.store.media_dir();
        fs::create_dir_all(&media_dir).map_err(MigrateError::IoError)?;

        let mut log = Vec::new();
        for (dir, media_type) in self.legacy_dirs() {
            for source in list_files(&dir)? {
                log.push(relocate_one(&source, &media_dir, media_type)?);
            }
        }
        Ok(log)
    }

    /// Delete unified-directory copies of files that still exist in a legacy
    /// directory. Legacy directories are never touched. Idempotent.
    pub fn rollback(&self) -> Result<usize, MigrateError> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let media_dir = self.store.media_dir();
        let mut removed = 0;
        for (dir, _) in self.legacy_dirs() {
            for source in list_files(&dir)? {
                let dest = media_dir.join(file_name_of(&source)?);
                if dest.exists() {
                    fs::remove_file(&dest).map_err(MigrateError::IoError)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Delete the legacy copies. Irreversible; deliberately decoupled from
    /// `migrate()` and never invoked by the orchestrator. Each legacy file
    /// must have a checksum-identical unified copy or the cleanup aborts
    /// before deleting it.
    pub fn cleanup(&self) -> Result<usize, MigrateError> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let media_dir = self.store.media_dir();
        let mut removed = 0;
        for (dir, _) in self.legacy_dirs() {
            for source in list_files(&dir)? {
                let name = file_name_of(&source)?;
                let dest = media_dir.join(&name);
                if !dest.exists() {
                    return Err(MigrateError::Corruption(format!(
                        "{name}: no unified copy exists; run file migration before cleanup"
                    )));
                }
                if hash_file(&source)? != hash_file(&dest)? {
                    return Err(MigrateError::Corruption(format!(
                        "{name}: unified copy does not match the legacy original"
                    )));
                }
                fs::remove_file(&source).map_err(MigrateError::IoError)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn legacy_dirs(&self) -> [(PathBuf, MediaType); 2] {
        [
            (self.store.images_dir(), MediaType::Image),
            (self.store.docs_dir(), MediaType::Document),
        ]
    }
}

fn relocate_one(
    source: &Path,
    media_dir: &Path,
    media_type: MediaType,
) -> Result<RelocationEntry, MigrateError> {
    let name = file_name_of(source)?;
    let dest = media_dir.join(&name);
    let source_hash = hash_file(source)?;

    if dest.exists() {
        // Prior run already placed this file; anything else under the same
        // name is a collision we must not paper over.
        if hash_file(&dest)? != source_hash {
            return Err(MigrateError::Corruption(format!(
                "{name}: a different file already occupies the unified directory"
            )));
        }
        return Ok(RelocationEntry {
            file_name: name,
            source_path: source.to_path_buf(),
            dest_path: dest,
            media_type,
            moved: false,
        });
    }

    fs::copy(source, &dest).map_err(MigrateError::IoError)?;
    if hash_file(&dest)? != source_hash {
        // Do not leave a known-bad copy behind.
        let _ = fs::remove_file(&dest);
        return Err(MigrateError::Corruption(format!(
            "{name}: copy did not match its source"
        )));
    }
    Ok(RelocationEntry {
        file_name: name,
        source_path: source.to_path_buf(),
        dest_path: dest,
        media_type,
        moved: true,
    })
}

/// Regular files in `dir`, sorted by name. A missing directory is empty.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(MigrateError::IoError(e)),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(MigrateError::IoError)?;
        if entry.file_type().map_err(MigrateError::IoError)?.is_file() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn file_name_of(path: &Path) -> Result<String, MigrateError> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| MigrateError::Validation(format!("{} has no file name", path.display())))
}

pub fn hash_file(path: &Path) -> Result<Vec<u8>, MigrateError> {
    let bytes = fs::read(path).map_err(MigrateError::IoError)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_vec())
}

pub fn hash_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
