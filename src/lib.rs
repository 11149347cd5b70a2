//! mediamerge: a live, reversible schema-and-data unification migration.
//!
//! Two legacy record sets (independently addressable image and document
//! entities) are merged into one polymorphic media entity, while the files
//! backing those records move from per-type upload directories into one
//! unified directory. The engine covers migration, backup and rollback
//! orchestration; the serving application (HTTP API, admin UI, static file
//! serving) consumes the unified model but holds no migration logic.
//!
//! # Execution model
//!
//! Single-writer, sequential: run it while nothing else mutates the store.
//! Every mutating operation takes an advisory lock file and fails fast with
//! `Busy` if it is already held. Read-only operations (`backup list`,
//! `verify`) take no lock.
//!
//! # Safety ladder
//!
//! - `backup create` before anything mutates.
//! - Schema unification commits through a single marker row; a crash before
//!   the marker counts as "not run".
//! - File relocation copies, never moves; legacy files survive until the
//!   operator explicitly runs the irreversible `file-migrate --cleanup`.
//! - The orchestrator reverses automatically on failure and leaves
//!   `backup restore` as the manual last resort.
//!
//! # Crate structure
//!
//! - [`core`]: the engine (store handle, backup, schema migrator, file
//!   relocator, verifier, orchestrator)
//! - `cli`: clap argument types; dispatch lives in [`run`]

pub mod core;

mod cli;

use crate::cli::{BackupCommand, Cli, Command};
use crate::core::backup::BackupManager;
use crate::core::error::MigrateError;
use crate::core::migrator::SchemaMigrator;
use crate::core::orchestrator::Orchestrator;
use crate::core::relocate::FileRelocator;
use crate::core::store::Store;
use crate::core::verify::Verifier;
use crate::core::db;

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Ask the operator before a destructive action. Anything but y/yes declines.
fn confirm(prompt: &str) -> Result<bool, MigrateError> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().map_err(MigrateError::IoError)?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(MigrateError::IoError)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();
    let store = Store::new(cli.store.db, cli.store.uploads, cli.store.backups);

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init => {
            db::initialize_store(&store)?;
            println!(
                "{} store initialized at {}",
                "✓".bright_green(),
                store.db_path.display()
            );
            Ok(())
        }
        Command::Backup(backup_cli) => match backup_cli.command {
            BackupCommand::Create { output } => {
                let store = match output {
                    Some(dir) => Store::new(store.db_path, store.uploads_root, dir),
                    None => store,
                };
                let artifact = BackupManager::new(store).create_backup()?;
                println!("{}", artifact.display());
                Ok(())
            }
            BackupCommand::List => {
                for artifact in BackupManager::new(store).list_backups()? {
                    println!("{}", artifact.display());
                }
                Ok(())
            }
            BackupCommand::Restore { backup, force } => {
                if !force
                    && !confirm(&format!(
                        "Overwrite {} with {}? This cannot be undone without another backup.",
                        store.db_path.display(),
                        backup.display()
                    ))?
                {
                    println!("aborted");
                    return Ok(());
                }
                BackupManager::new(store).restore_backup(&backup)?;
                println!("{} restored from {}", "✓".bright_green(), backup.display());
                Ok(())
            }
            BackupCommand::Delete { backup, force } => {
                if !force && !confirm(&format!("Delete artifact {}?", backup.display()))? {
                    println!("aborted");
                    return Ok(());
                }
                BackupManager::new(store).delete_backup(&backup)?;
                println!("{} deleted {}", "✓".bright_green(), backup.display());
                Ok(())
            }
        },
        Command::Migrate { rollback } => {
            let migrator = SchemaMigrator::new(store);
            if rollback {
                migrator.rollback()
            } else {
                migrator.migrate()
            }
        }
        Command::FileMigrate {
            rollback,
            cleanup,
            force,
        } => {
            let relocator = FileRelocator::new(store);
            if rollback {
                let removed = relocator.rollback()?;
                println!("{} removed {} unified copies", "✓".bright_green(), removed);
            } else if cleanup {
                if !force
                    && !confirm(
                        "Delete the legacy upload copies? This is irreversible; run only after verification.",
                    )?
                {
                    println!("aborted");
                    return Ok(());
                }
                let removed = relocator.cleanup()?;
                println!("{} removed {} legacy copies", "✓".bright_green(), removed);
            } else {
                let log = relocator.migrate()?;
                let moved = log.iter().filter(|e| e.moved).count();
                for entry in &log {
                    let mark = if entry.moved { "→" } else { "=" };
                    println!(
                        "  {} {} {} {}",
                        entry.media_type.as_str(),
                        entry.source_path.display(),
                        mark,
                        entry.dest_path.display()
                    );
                }
                println!(
                    "{} relocated {} files ({} already in place)",
                    "✓".bright_green(),
                    moved,
                    log.len() - moved
                );
            }
            Ok(())
        }
        Command::Verify { format } => {
            let report = Verifier::new(store).verify()?;
            match format.as_str() {
                "json" => {
                    let json = serde_json::to_string_pretty(&report)
                        .map_err(|e| MigrateError::Validation(e.to_string()))?;
                    println!("{json}");
                }
                _ => {
                    println!("unified:          {}", report.unified_count);
                    println!("legacy images:    {}", report.legacy_image_count);
                    println!("legacy documents: {}", report.legacy_document_count);
                    println!("sampled:          {}", report.sampled);
                    for name in &report.mismatched {
                        println!("  {} {}", "✗".bright_red(), name);
                    }
                    let verdict = if report.ok {
                        "ok".bright_green().to_string()
                    } else {
                        "mismatch".bright_red().to_string()
                    };
                    println!("result:           {verdict}");
                }
            }
            if !report.ok {
                return Err(MigrateError::VerificationMismatch(format!(
                    "{} mismatched record(s), unified={} legacy={}+{}",
                    report.mismatched.len(),
                    report.unified_count,
                    report.legacy_image_count,
                    report.legacy_document_count
                )));
            }
            Ok(())
        }
        Command::StagingMigrate {
            skip_backup,
            rollback,
            rollback_skip_backup,
        } => {
            let orchestrator = Orchestrator::new(store);
            if rollback || rollback_skip_backup {
                orchestrator.rollback(rollback_skip_backup)?;
                println!("{} rollback complete", "✓".bright_green());
            } else {
                let report = orchestrator.run(skip_backup)?;
                println!(
                    "{} staging migration complete ({} records, {} checksum-sampled)",
                    "✓".bright_green(),
                    report.unified_count,
                    report.sampled
                );
            }
            Ok(())
        }
    }
}

// Re-exported for integration tests and embedding callers.
pub use crate::core::relocate::RelocationEntry;
pub use crate::core::verify::VerifyReport;
