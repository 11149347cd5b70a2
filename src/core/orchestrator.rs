//! End-to-end migration flow: backup, schema unification, file relocation,
//! verification — with automatic reverse on failure.
//!
//! Any stage failing after the backup triggers the reverse path (file
//! rollback, then schema rollback). Errors raised during the reverse path are
//! reported but never recurse; restoring from the backup artifact is the
//! operator's last resort and is pointed at, never performed automatically.
//! Likewise `FileRelocator::cleanup` is never called from here.

use crate::core::backup::BackupManager;
use crate::core::error::MigrateError;
use crate::core::migrator::SchemaMigrator;
use crate::core::relocate::FileRelocator;
use crate::core::store::Store;
use crate::core::verify::{Verifier, VerifyReport};
use colored::Colorize;

pub struct Orchestrator {
    store: Store,
}

impl Orchestrator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Full forward flow. Returns the verification report on success.
    pub fn run(&self, skip_backup: bool) -> Result<VerifyReport, MigrateError> {
        if skip_backup {
            println!("  {} backup stage skipped on request", "▸".bright_yellow());
        } else {
            stage_banner("backup");
            let artifact = BackupManager::new(self.store.clone())
                .create_backup()
                .map_err(|e| e.at_stage("backup"))?;
            println!("  {} backup written to {}", "✓".bright_green(), artifact.display());
        }

        stage_banner("schema-migrate");
        if let Err(e) = SchemaMigrator::new(self.store.clone()).migrate() {
            self.reverse();
            return Err(e.at_stage("schema-migrate"));
        }

        stage_banner("file-migrate");
        match FileRelocator::new(self.store.clone()).migrate() {
            Ok(log) => {
                let moved = log.iter().filter(|e| e.moved).count();
                println!(
                    "  {} relocated {} files ({} already in place)",
                    "✓".bright_green(),
                    moved,
                    log.len() - moved
                );
            }
            Err(e) => {
                self.reverse();
                return Err(e.at_stage("file-migrate"));
            }
        }

        stage_banner("verify");
        let report = match Verifier::new(self.store.clone()).verify() {
            Ok(report) => report,
            Err(e) => {
                self.reverse();
                return Err(e.at_stage("verify"));
            }
        };
        if report.ok {
            println!(
                "  {} verified: {} unified records match {} + {} legacy",
                "✓".bright_green(),
                report.unified_count,
                report.legacy_image_count,
                report.legacy_document_count
            );
        } else {
            // Verification mismatch is non-fatal by contract: report it and
            // leave the decision (retry, manual rollback, restore) to the
            // operator rather than reversing automatically.
            println!("  {} verification reported mismatches:", "✗".bright_red());
            for name in &report.mismatched {
                println!("      {name}");
            }
            return Err(MigrateError::VerificationMismatch(format!(
                "unified={} legacy={}+{} mismatched_files={}",
                report.unified_count,
                report.legacy_image_count,
                report.legacy_document_count,
                report.mismatched.len()
            )));
        }
        Ok(report)
    }

    /// Reverse flow as its own entry point (`staging-migrate --rollback`).
    pub fn rollback(&self, skip_backup: bool) -> Result<(), MigrateError> {
        if !skip_backup {
            stage_banner("backup");
            let artifact = BackupManager::new(self.store.clone())
                .create_backup()
                .map_err(|e| e.at_stage("backup"))?;
            println!("  {} backup written to {}", "✓".bright_green(), artifact.display());
        }
        stage_banner("file-rollback");
        let removed = FileRelocator::new(self.store.clone())
            .rollback()
            .map_err(|e| e.at_stage("file-rollback"))?;
        println!("  {} removed {} unified copies", "✓".bright_green(), removed);

        stage_banner("schema-rollback");
        SchemaMigrator::new(self.store.clone())
            .rollback()
            .map_err(|e| e.at_stage("schema-rollback"))?;
        Ok(())
    }

    /// Best-effort automatic reverse after a failed forward stage. Rollback
    /// errors are reported, not propagated; they leave restore-from-backup as
    /// the remaining path.
    fn reverse(&self) {
        println!("  {} stage failed, rolling back", "▸".bright_yellow());
        if let Err(e) = FileRelocator::new(self.store.clone()).rollback() {
            println!("  {} file rollback failed: {e}", "✗".bright_red());
        }
        if let Err(e) = SchemaMigrator::new(self.store.clone()).rollback() {
            println!("  {} schema rollback failed: {e}", "✗".bright_red());
        }
        println!(
            "  {} if the store is inconsistent, restore the latest artifact with 'backup restore'",
            "▸".bright_yellow()
        );
    }
}

fn stage_banner(stage: &str) {
    println!("{} {}", "==>".bright_cyan().bold(), stage.bright_white().bold());
}
