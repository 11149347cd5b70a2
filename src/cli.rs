//! CLI struct definitions for the mediamerge command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs::run`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "mediamerge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Reversible unification migration: merges legacy image/document records into one polymorphic media store and relocates their files into a unified directory, with backup, verification and rollback."
)]
pub(crate) struct Cli {
    #[clap(flatten)]
    pub store: StoreArgs,
    #[clap(subcommand)]
    pub command: Command,
}

/// Store location flags, shared by every subcommand. The engine takes these
/// as an explicit handle; nothing is read from global state.
#[derive(clap::Args, Debug)]
pub(crate) struct StoreArgs {
    /// Path to the live SQLite database file.
    #[clap(long, default_value = "data/store.db", global = true)]
    pub db: PathBuf,
    /// Uploads root containing images/, docs/ and media/.
    #[clap(long, default_value = "uploads", global = true)]
    pub uploads: PathBuf,
    /// Directory holding backup artifacts.
    #[clap(long, default_value = "backups", global = true)]
    pub backups: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database (legacy tables) and the upload directory layout
    Init,
    /// Backup artifact management
    Backup(BackupCli),
    /// Run the schema unification forward, or roll it back
    Migrate {
        /// Undo the unification instead of running it
        #[clap(long)]
        rollback: bool,
    },
    /// Relocate upload files into the unified directory, or reverse/clean up
    FileMigrate {
        /// Delete unified-directory copies, restoring the original layout
        #[clap(long, conflicts_with = "cleanup")]
        rollback: bool,
        /// Irreversibly delete the legacy copies (requires confirmation)
        #[clap(long, conflicts_with = "rollback")]
        cleanup: bool,
        /// Skip the interactive confirmation for --cleanup
        #[clap(long)]
        force: bool,
    },
    /// Compare legacy and unified views; exit 0 iff they agree
    Verify {
        /// Output format: 'text' or 'json'
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Run the full flow: backup, schema, files, verification
    StagingMigrate {
        /// Skip the backup stage of the forward flow
        #[clap(long, conflicts_with_all = ["rollback", "rollback_skip_backup"])]
        skip_backup: bool,
        /// Run the reverse flow (with a fresh backup first)
        #[clap(long, conflicts_with = "rollback_skip_backup")]
        rollback: bool,
        /// Run the reverse flow without taking a backup first
        #[clap(long)]
        rollback_skip_backup: bool,
    },
    /// Print version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct BackupCli {
    #[clap(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum BackupCommand {
    /// Snapshot the live store into a new timestamped artifact
    Create {
        /// Write the artifact into this directory instead of the default
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// List artifacts, oldest first
    List,
    /// Overwrite the live store with an artifact's contents
    Restore {
        /// Artifact path to restore from
        #[clap(long)]
        backup: PathBuf,
        /// Skip the interactive confirmation
        #[clap(long)]
        force: bool,
    },
    /// Remove an artifact
    Delete {
        /// Artifact path to delete
        #[clap(long)]
        backup: PathBuf,
        /// Skip the interactive confirmation
        #[clap(long)]
        force: bool,
    },
}
