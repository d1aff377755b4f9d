//! `aml memory` subcommands: bulk export and clear of one agent's memory.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::memory::ExportedMemory;
use std::io::Write;

#[derive(Debug, clap::Subcommand)]
pub enum MemoryCmd {
    /// Exports every pattern, solution and decision owned by an agent.
    Export {
        #[arg(long)]
        agent: String,
    },
    /// Deletes every pattern, solution and decision owned by an agent.
    Clear {
        #[arg(long)]
        agent: String,
    },
}

impl HumanRender for ExportedMemory {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(
            w,
            "{}: {} patterns, {} solutions, {} decisions",
            self.agent,
            self.patterns.len(),
            self.solutions.len(),
            self.decisions.len()
        )?;
        Ok(())
    }
}

pub fn run(cmd: MemoryCmd, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MemoryCmd::Export { agent } => {
            let principal = ctx.principal_for(&agent);
            let exported = ctx.store.export_memory(&principal, &agent.as_str().into())?;
            print(&exported, format)
        }
        MemoryCmd::Clear { agent } => {
            let principal = ctx.principal_for(&agent);
            ctx.store.clear_memory(&principal, &agent.as_str().into())?;
            println!("cleared memory for {agent}");
            Ok(())
        }
    }
}
