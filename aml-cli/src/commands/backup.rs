//! `aml backup` subcommands: full/incremental snapshots and restore.

use crate::output::{print, HumanRender, OutputFormat};
use aml_core::backup::BackupManager;
use aml_core::types::BackupDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, clap::Subcommand)]
pub enum BackupCmd {
    /// Creates a full backup of the entire memory tree.
    Create {
        /// Backup id to assign.
        #[arg(long)]
        id: String,
        /// Makes this an incremental backup relative to `--base`.
        #[arg(long)]
        base: Option<String>,
    },
    /// Lists known backups, newest first.
    List,
    /// Recomputes checksums and reports whether the archive is intact.
    Validate {
        #[arg(long)]
        id: String,
    },
    /// Restores a backup over the live tree.
    Restore {
        #[arg(long)]
        id: String,
        /// Overwrite untracked live files instead of refusing (
        /// `RestoreConflict`).
        #[arg(long)]
        force: bool,
        /// Take a full backup under this id before restoring.
        #[arg(long)]
        pre_restore_backup: Option<String>,
    },
    /// Restores the newest backup at or before a timestamp.
    RestoreToPointInTime {
        /// RFC 3339 timestamp.
        #[arg(long)]
        at: DateTime<Utc>,
        #[arg(long)]
        force: bool,
    },
    /// Deletes one backup.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Keeps only the `n` most recent backups.
    Prune {
        #[arg(long)]
        keep_last: usize,
    },
}

fn manager(data_dir: &std::path::Path) -> anyhow::Result<BackupManager> {
    let backup_dir: PathBuf = data_dir
    .parent()
    .unwrap_or(data_dir)
    .join(format!(
            "{}-backups",
            data_dir.file_name().and_then(|n| n.to_str()).unwrap_or("memory")
    ));
    Ok(BackupManager::new(data_dir, backup_dir)?)
}

impl HumanRender for BackupDescriptor {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(
            w,
            "{} {:?} {} bytes {} files agents={:?}",
            self.backup_id,
            self.r#type,
            self.size,
            self.files.len(),
            self.agents_included
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct BackupList(Vec<BackupDescriptor>);

impl HumanRender for BackupList {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(w, "(no backups)")?;
        }
        for d in &self.0 {
            d.render_human(&mut w)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ValidationResult {
    backup_id: String,
    valid: bool,
    detail: Option<String>,
}

impl HumanRender for ValidationResult {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        match &self.detail {
            Some(detail) => writeln!(w, "{}: INVALID ({detail})", self.backup_id),
            None => writeln!(w, "{}: valid", self.backup_id),
        }?;
        Ok(())
    }
}

pub fn run(cmd: BackupCmd, data_dir: &std::path::Path, format: OutputFormat) -> anyhow::Result<()> {
    let mgr = manager(data_dir)?;
    match cmd {
        BackupCmd::Create { id, base } => {
            let descriptor = match base {
                Some(base_id) => mgr.create_incremental_backup(&id, &base_id)?,
                None => mgr.create_full_backup(&id)?,
            };
            print(&descriptor, format)
        }
        BackupCmd::List => print(&BackupList(mgr.list_backups()?), format),
        BackupCmd::Validate { id } => {
            let result = match mgr.validate_backup(&id) {
                Ok(()) => ValidationResult {
                    backup_id: id,
                    valid: true,
                    detail: None,
                },
                Err(e) => ValidationResult {
                    backup_id: id,
                    valid: false,
                    detail: Some(e.to_string()),
                },
            };
            print(&result, format)
        }
        BackupCmd::Restore { id, force, pre_restore_backup } => {
            let descriptor = mgr.restore(&id, force, pre_restore_backup.as_deref())?;
            print(&descriptor, format)
        }
        BackupCmd::RestoreToPointInTime { at, force } => {
            let descriptor = mgr.restore_to_point_in_time(at, force)?;
            print(&descriptor, format)
        }
        BackupCmd::Delete { id } => {
            mgr.delete_backup(&id)?;
            println!("deleted {id}");
            Ok(())
        }
        BackupCmd::Prune { keep_last } => {
            let deleted = mgr.keep_last_n_backups(keep_last)?;
            println!("pruned {} backups", deleted.len());
            for id in deleted {
                println!(" {id}");
            }
            Ok(())
        }
    }
}
