//! Subcommand trees, one module per entity/concern.

pub mod audit;
pub mod backup;
pub mod config;
pub mod decision;
pub mod health;
pub mod memory;
pub mod pattern;
pub mod solution;

use crate::context::Context;
use crate::output::OutputFormat;

/// Top-level subcommand groups, mirrored 1:1 onto the system's
/// component list.
#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Pattern records.
    #[command(subcommand)]
    Pattern(pattern::PatternCmd),
    /// Solution records.
    #[command(subcommand)]
    Solution(solution::SolutionCmd),
    /// Decision records.
    #[command(subcommand)]
    Decision(decision::DecisionCmd),
    /// Bulk export/clear across all three entity kinds for an agent.
    #[command(subcommand)]
    Memory(memory::MemoryCmd),
    /// Full/incremental backups and restore.
    #[command(subcommand)]
    Backup(backup::BackupCmd),
    /// Audit trail queries and reports.
    #[command(subcommand)]
    Audit(audit::AuditCmd),
    /// Configuration parsing and validation.
    #[command(subcommand)]
    Config(config::ConfigCmd),
    /// Per-agent health/metrics rollup.
    Health(health::HealthArgs),
}

pub fn dispatch(command: Command, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Pattern(cmd) => pattern::run(cmd, ctx, format),
        Command::Solution(cmd) => solution::run(cmd, ctx, format),
        Command::Decision(cmd) => decision::run(cmd, ctx, format),
        Command::Memory(cmd) => memory::run(cmd, ctx, format),
        Command::Backup(cmd) => backup::run(cmd, &ctx.store.storage_root().to_path_buf(), format),
        Command::Audit(cmd) => audit::run(cmd, ctx, format),
        Command::Config(cmd) => config::run(cmd, format),
        Command::Health(args) => health::run(args, ctx, format),
    }
}
