//! Advisory lock for mutating operations.
//!
//! The engine is single-writer by contract: at most one migration, rollback,
//! relocation or cleanup may be in flight per store. The lock is a file
//! created with `create_new` next to the database; a second acquirer fails
//! fast with `Busy`. Read-only operations (listing backups, verification)
//! never take it.

use crate::core::error::MigrateError;
use crate::core::store::Store;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct MigrationLock {
    path: PathBuf,
}

impl MigrationLock {
    /// Acquire the store's advisory lock, failing with `Busy` if held.
    pub fn acquire(store: &Store) -> Result<Self, MigrateError> {
        let path = store.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(MigrateError::IoError)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(MigrateError::Busy(format!(
                    "lock file {} exists; another run holds the store (remove it manually only if that process is dead)",
                    path.display()
                )));
            }
            Err(e) => return Err(MigrateError::IoError(e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(MigrateError::IoError)?;
        Ok(Self { path })
    }

    /// True iff a lock file is present for the store.
    pub fn is_held(store: &Store) -> bool {
        store.lock_path().exists()
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        // Best effort; a stale file after a crash is surfaced as Busy.
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> Store {
        Store::new(
            tmp.path().join("store.db"),
            tmp.path().join("uploads"),
            tmp.path().join("backups"),
        )
    }

    #[test]
    fn test_second_acquire_fails_busy() {
        let tmp = TempDir::new().expect("tempdir");
        let store = store_in(&tmp);
        let _held = MigrationLock::acquire(&store).expect("first acquire");
        let second = MigrationLock::acquire(&store);
        assert!(matches!(second, Err(MigrateError::Busy(_))));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let tmp = TempDir::new().expect("tempdir");
        let store = store_in(&tmp);
        {
            let _held = MigrationLock::acquire(&store).expect("acquire");
            assert!(MigrationLock::is_held(&store));
        }
        assert!(!MigrationLock::is_held(&store));
        let again = MigrationLock::acquire(&store);
        assert!(again.is_ok(), "reacquire after drop should succeed");
    }
}
