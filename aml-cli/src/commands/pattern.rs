//! `aml pattern` subcommands: CRUD over one agent's patterns.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::types::Pattern;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, clap::Subcommand)]
pub enum PatternCmd {
    /// Creates a pattern from a JSON file.
    Add {
        /// Owning agent.
        #[arg(long)]
        agent: String,
        /// Path to a JSON-encoded `Pattern`.
        #[arg(long)]
        file: PathBuf,
    },
    /// Lists every pattern owned by an agent.
    List {
        /// Agent to list patterns for.
        #[arg(long)]
        agent: String,
    },
    /// Overwrites an existing pattern from a JSON file.
    Update {
        /// Owning agent.
        #[arg(long)]
        agent: String,
        /// Path to a JSON-encoded `Pattern`.
        #[arg(long)]
        file: PathBuf,
    },
    /// Deletes a pattern by id.
    Delete {
        /// Owning agent.
        #[arg(long)]
        agent: String,
        /// Pattern id.
        #[arg(long)]
        id: Uuid,
        /// Keep the pattern's time-series history instead of cascading
        /// the delete to it.
        #[arg(long)]
        keep_history: bool,
    },
}

#[derive(Serialize)]
struct PatternList(Vec<Pattern>);

impl HumanRender for PatternList {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(w, "(no patterns)")?;
        }
        for p in &self.0 {
            writeln!(
                w,
                "{} {:<24} success={:.2} uses={} confidence={:.2}",
                p.id, p.pattern.r#type, p.metrics.success_rate, p.metrics.execution_count, p.evolution.confidence_score
            )?;
        }
        Ok(())
    }
}

impl HumanRender for Pattern {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "{} ({})", self.id, self.pattern.r#type)?;
        writeln!(w, " agent: {}", self.agent)?;
        writeln!(w, " technique: {}", self.pattern.approach.technique)?;
        writeln!(
            w,
            " success_rate={:.2} execution_count={} confidence={:.2}",
            self.metrics.success_rate, self.metrics.execution_count, self.evolution.confidence_score
        )?;
        Ok(())
    }
}

pub fn run(cmd: PatternCmd, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PatternCmd::Add { agent, file } => {
            let pattern: Pattern = serde_json::from_slice(&std::fs::read(file)?)?;
            let principal = ctx.principal_for(&agent);
            ctx.store.ensure_agent_directory(&agent.as_str().into())?;
            let created = ctx.store.add_pattern(&principal, pattern)?;
            print(&created, format)
        }
        PatternCmd::List { agent } => {
            let principal = ctx.principal_for(&agent);
            let patterns = ctx.store.get_patterns(&principal, &agent.as_str().into(), None)?;
            print(&PatternList(patterns), format)
        }
        PatternCmd::Update { agent, file } => {
            let pattern: Pattern = serde_json::from_slice(&std::fs::read(file)?)?;
            let principal = ctx.principal_for(&agent);
            let updated = ctx.store.update_pattern(&principal, pattern)?;
            print(&updated, format)
        }
        PatternCmd::Delete { agent, id, keep_history } => {
            let principal = ctx.principal_for(&agent);
            ctx.store.delete_pattern(&principal, &agent.as_str().into(), id, !keep_history)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}
