use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("duplicate file name: {0}")]
    DuplicateKey(String),
    #[error("checksum mismatch: {0}")]
    Corruption(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("another migration is in flight: {0}")]
    Busy(String),
    #[error("store is in use: {0}")]
    Conflict(String),
    #[error("live store unavailable: {0}")]
    SourceUnavailable(String),
    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Wrap an error with the orchestrator stage it surfaced in.
    pub fn at_stage(self, stage: &str) -> MigrateError {
        MigrateError::StageFailed {
            stage: stage.to_string(),
            source: Box::new(self),
        }
    }
}
