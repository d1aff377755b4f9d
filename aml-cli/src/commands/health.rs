//! `aml health` subcommand: a point-in-time rollup of storage, cache,
//! learning and usage metrics for one agent.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::metrics::AgentMetricsReport;
use chrono::{DateTime, Utc};
use std::io::Write;

#[derive(Debug, clap::Args)]
pub struct HealthArgs {
    #[arg(long)]
    agent: String,
    /// Start of the window usage counters are drawn from; defaults to the
    /// start of the current process (since usage counters live in the
    /// in-process audit buffer, not on disk).
    #[arg(long)]
    since: Option<DateTime<Utc>>,
}

impl HumanRender for AgentMetricsReport {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "agent: {}", self.agent)?;
        writeln!(w, "collected_at: {}", self.collected_at)?;
        writeln!(
            w,
            "storage: {} entities, {} bytes",
            self.storage.total_entities(),
            self.storage.bytes_used
        )?;
        writeln!(
            w,
            "cache: {} hits, {} misses, hit_rate={:.2}",
            self.cache.hits, self.cache.misses, self.cache.hit_rate
        )?;
        writeln!(
            w,
            "learning: q_table_size={} mean_q={:.3} epsilon={:.3}",
            self.learning.q_table_size, self.learning.mean_q_value, self.learning.epsilon
        )?;
        writeln!(
            w,
            "usage: {} ops, {:.1}% success",
            self.usage.total_operations,
            self.usage.success_rate() * 100.0
        )?;
        writeln!(w, "health_score: {:.3}", self.health_score)?;
        Ok(())
    }
}

pub fn run(args: HealthArgs, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    let since = args.since.unwrap_or_else(|| ctx.started_at);
    let report = AgentMetricsReport::collect(
        &ctx.store,
        &ctx.learning,
        &args.agent.as_str().into(),
        since,
    )?;
    print(&report, format)
}
