//! Store handle for the migration engine.
//!
//! A `Store` names everything the engine touches: the SQLite database, the
//! uploads root with its per-type and unified subdirectories, and the backup
//! directory. Components receive a `Store` at construction instead of reading
//! package-level state, so tests can run several isolated stores at once.

use std::path::{Path, PathBuf};

/// Legacy image uploads live here, relative to the uploads root.
pub const IMAGES_SUBDIR: &str = "images";
/// Legacy document uploads live here, relative to the uploads root.
pub const DOCS_SUBDIR: &str = "docs";
/// Unified media target directory, relative to the uploads root.
pub const MEDIA_SUBDIR: &str = "media";

/// Advisory lock file name, placed next to the database.
pub const LOCK_FILE: &str = ".migrate.lock";

/// Handle for one persisted store and its on-disk file layout.
#[derive(Debug, Clone)]
pub struct Store {
    /// Path to the live SQLite database file.
    pub db_path: PathBuf,
    /// Root directory containing `images/`, `docs/` and `media/`.
    pub uploads_root: PathBuf,
    /// Directory holding immutable backup artifacts.
    pub backups_dir: PathBuf,
}

impl Store {
    pub fn new(db_path: PathBuf, uploads_root: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            db_path,
            uploads_root,
            backups_dir,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.uploads_root.join(IMAGES_SUBDIR)
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.uploads_root.join(DOCS_SUBDIR)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.uploads_root.join(MEDIA_SUBDIR)
    }

    /// Lock file path. Lives next to the database so every process that can
    /// see the store can see the lock.
    pub fn lock_path(&self) -> PathBuf {
        match self.db_path.parent() {
            Some(parent) => parent.join(LOCK_FILE),
            None => Path::new(LOCK_FILE).to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths_derive_from_uploads_root() {
        let store = Store::new(
            PathBuf::from("/tmp/s/store.db"),
            PathBuf::from("/tmp/s/uploads"),
            PathBuf::from("/tmp/s/backups"),
        );
        assert_eq!(store.images_dir(), PathBuf::from("/tmp/s/uploads/images"));
        assert_eq!(store.docs_dir(), PathBuf::from("/tmp/s/uploads/docs"));
        assert_eq!(store.media_dir(), PathBuf::from("/tmp/s/uploads/media"));
        assert_eq!(store.lock_path(), PathBuf::from("/tmp/s/.migrate.lock"));
    }
}
