//! `aml decision` subcommands: decisions are append-only, so there is
//! no `update`.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::types::Decision;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, clap::Subcommand)]
pub enum DecisionCmd {
    /// Records a decision from a JSON file.
    Add {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Lists every decision recorded by an agent.
    List {
        #[arg(long)]
        agent: String,
    },
    /// Deletes a decision by id. Admin-only escape hatch.
    Delete {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Serialize)]
struct DecisionList(Vec<Decision>);

impl HumanRender for DecisionList {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(w, "(no decisions)")?;
        }
        for d in &self.0 {
            writeln!(w, "{} {} -> {}", d.id, d.question, d.chosen_option)?;
        }
        Ok(())
    }
}

impl HumanRender for Decision {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "{}", self.id)?;
        writeln!(w, " question: {}", self.question)?;
        writeln!(w, " chosen: {}", self.chosen_option)?;
        writeln!(w, " rationale: {}", self.rationale)?;
        Ok(())
    }
}

pub fn run(cmd: DecisionCmd, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DecisionCmd::Add { agent, file } => {
            let decision: Decision = serde_json::from_slice(&std::fs::read(file)?)?;
            let principal = ctx.principal_for(&agent);
            ctx.store.ensure_agent_directory(&agent.as_str().into())?;
            let created = ctx.store.add_decision(&principal, decision)?;
            print(&created, format)
        }
        DecisionCmd::List { agent } => {
            let principal = ctx.principal_for(&agent);
            let decisions = ctx.store.get_decisions(&principal, &agent.as_str().into())?;
            print(&DecisionList(decisions), format)
        }
        DecisionCmd::Delete { agent, id } => {
            let principal = ctx.principal_for(&agent);
            ctx.store.delete_decision(&principal, &agent.as_str().into(), id)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}
