//! Backup artifacts: opaque, timestamped byte-level snapshots of the live
//! database. Artifacts are immutable once written and only removed on
//! explicit operator request.
//!
//! Destructive calls (`restore_backup`, `delete_backup`) run unconditionally
//! once invoked; interactive confirmation is the CLI's job, not this
//! component's.

use crate::core::error::MigrateError;
use crate::core::lock::MigrationLock;
use crate::core::store::Store;
use crate::core::time;
use std::fs;
use std::path::{Path, PathBuf};

const ARTIFACT_PREFIX: &str = "backup-";
const ARTIFACT_SUFFIX: &str = ".db";

pub struct BackupManager {
    store: Store,
}

impl BackupManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Snapshot the live database into a new artifact. The copy is a plain
    /// byte copy; the caller guarantees no concurrent writer (single-writer
    /// execution model).
    pub fn create_backup(&self) -> Result<PathBuf, MigrateError> {
        if !self.store.db_path.exists() {
            return Err(MigrateError::SourceUnavailable(format!(
                "live store {} does not exist",
                self.store.db_path.display()
            )));
        }
        fs::create_dir_all(&self.store.backups_dir).map_err(MigrateError::IoError)?;

        let name = format!("{}{}{}", ARTIFACT_PREFIX, time::sortable_stamp(), ARTIFACT_SUFFIX);
        let artifact = self.store.backups_dir.join(name);
        fs::copy(&self.store.db_path, &artifact).map_err(MigrateError::IoError)?;
        Ok(artifact)
    }

    /// All artifacts, oldest first. Missing or empty backup directory is an
    /// empty list, never an error.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, MigrateError> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.store.backups_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(MigrateError::IoError(e)),
        };
        for entry in entries {
            let entry = entry.map_err(MigrateError::IoError)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_SUFFIX) {
                out.push(entry.path());
            }
        }
        // Artifact names embed a fixed-width stamp, so lexical order is
        // creation order.
        out.sort();
        Ok(out)
    }

    /// Overwrite the live database with the artifact's bytes. Destructive and
    /// irreversible except via another backup. Refuses to run while the
    /// advisory lock is held.
    pub fn restore_backup(&self, artifact: &Path) -> Result<(), MigrateError> {
        if !artifact.exists() {
            return Err(MigrateError::NotFound(format!(
                "backup artifact {}",
                artifact.display()
            )));
        }
        if MigrationLock::is_held(&self.store) {
            return Err(MigrateError::Conflict(format!(
                "lock file {} is held; stop the running operation before restoring",
                self.store.lock_path().display()
            )));
        }
        if let Some(parent) = self.store.db_path.parent() {
            fs::create_dir_all(parent).map_err(MigrateError::IoError)?;
        }
        fs::copy(artifact, &self.store.db_path).map_err(MigrateError::IoError)?;

        // Stale WAL/SHM sidecars would shadow the restored image.
        for ext in ["-wal", "-shm"] {
            let sidecar = PathBuf::from(format!("{}{ext}", self.store.db_path.display()));
            if sidecar.exists() {
                fs::remove_file(&sidecar).map_err(MigrateError::IoError)?;
            }
        }
        Ok(())
    }

    pub fn delete_backup(&self, artifact: &Path) -> Result<(), MigrateError> {
        if !artifact.exists() {
            return Err(MigrateError::NotFound(format!(
                "backup artifact {}",
                artifact.display()
            )));
        }
        fs::remove_file(artifact).map_err(MigrateError::IoError)?;
        Ok(())
    }
}
