//! `aml solution` subcommands: CRUD over one agent's solutions.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::types::Solution;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, clap::Subcommand)]
pub enum SolutionCmd {
    /// Creates a solution from a JSON file.
    Add {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Lists every solution owned by an agent.
    List {
        #[arg(long)]
        agent: String,
    },
    /// Overwrites an existing solution from a JSON file.
    Update {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Deletes a solution by id (idempotent).
    Delete {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Serialize)]
struct SolutionList(Vec<Solution>);

impl HumanRender for SolutionList {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(w, "(no solutions)")?;
        }
        for s in &self.0 {
            writeln!(
                w,
                "{} {:<32} success={:.2} uses={}",
                s.id, s.problem.fingerprint, s.metrics.success_rate, s.metrics.execution_count
            )?;
        }
        Ok(())
    }
}

impl HumanRender for Solution {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "{} ({})", self.id, self.problem.fingerprint)?;
        writeln!(w, " agent: {}", self.agent)?;
        writeln!(w, " verification: {}", self.fix.verification)?;
        Ok(())
    }
}

pub fn run(cmd: SolutionCmd, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SolutionCmd::Add { agent, file } => {
            let solution: Solution = serde_json::from_slice(&std::fs::read(file)?)?;
            let principal = ctx.principal_for(&agent);
            ctx.store.ensure_agent_directory(&agent.as_str().into())?;
            let created = ctx.store.add_solution(&principal, solution)?;
            print(&created, format)
        }
        SolutionCmd::List { agent } => {
            let principal = ctx.principal_for(&agent);
            let solutions = ctx.store.get_solutions(&principal, &agent.as_str().into())?;
            print(&SolutionList(solutions), format)
        }
        SolutionCmd::Update { agent, file } => {
            let solution: Solution = serde_json::from_slice(&std::fs::read(file)?)?;
            let principal = ctx.principal_for(&agent);
            let updated = ctx.store.update_solution(&principal, solution)?;
            print(&updated, format)
        }
        SolutionCmd::Delete { agent, id } => {
            let principal = ctx.principal_for(&agent);
            ctx.store.delete_solution(&principal, &agent.as_str().into(), id)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}
