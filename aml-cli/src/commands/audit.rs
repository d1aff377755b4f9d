//! `aml audit` subcommands: query and summarize the audit trail.
//!
//! The audit log is appended to for the lifetime of the invoking process, so
//! `query`/`report` only see events produced earlier in the same command —
//! useful mainly when chained into a script that performs several operations
//! before inspecting the trail.

use crate::context::Context;
use crate::output::{print, HumanRender, OutputFormat};
use aml_core::security::audit::{AuditEvent, AuditEventType, AuditFilter, AuditReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, clap::Subcommand)]
pub enum AuditCmd {
    /// Lists audit events matching a filter.
    Query {
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, value_enum)]
        event_type: Option<AuditEventTypeArg>,
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        #[arg(long)]
        failures_only: bool,
    },
    /// Summarizes events in a time window.
    Report {
        #[arg(long)]
        since: DateTime<Utc>,
        #[arg(long)]
        until: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum AuditEventTypeArg {
    Read,
    Write,
    Delete,
    AccessDenied,
    Backup,
    Config,
}

impl From<AuditEventTypeArg> for AuditEventType {
    fn from(value: AuditEventTypeArg) -> Self {
        match value {
            AuditEventTypeArg::Read => AuditEventType::Read,
            AuditEventTypeArg::Write => AuditEventType::Write,
            AuditEventTypeArg::Delete => AuditEventType::Delete,
            AuditEventTypeArg::AccessDenied => AuditEventType::AccessDenied,
            AuditEventTypeArg::Backup => AuditEventType::Backup,
            AuditEventTypeArg::Config => AuditEventType::Config,
        }
    }
}

#[derive(Serialize)]
struct AuditEventList(Vec<AuditEvent>);

impl HumanRender for AuditEventList {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(w, "(no events)")?;
        }
        for e in &self.0 {
            writeln!(
                w,
                "{} {:?} {} success={} agent={:?}",
                e.timestamp, e.event_type, e.action, e.success, e.agent
            )?;
        }
        Ok(())
    }
}

impl HumanRender for AuditReport {
    fn render_human<W: Write>(&self, mut w: W) -> anyhow::Result<()> {
        writeln!(w, "window: {}.. {}", self.since, self.until)?;
        writeln!(w, "total_events: {}", self.total_events)?;
        writeln!(w, "failures: {}", self.failure_count)?;
        writeln!(w, "access_denied: {}", self.access_denied_count)?;
        writeln!(w, "deletes: {}", self.delete_count)?;
        Ok(())
    }
}

pub fn run(cmd: AuditCmd, ctx: &Context, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuditCmd::Query { agent, event_type, since, until, failures_only } => {
            let filter = AuditFilter {
                since,
                until,
                agent: agent.map(|a| a.as_str().into()),
                event_type: event_type.map(Into::into),
                failures_only,
            };
            let events = ctx.store.audit().query(&filter);
            print(&AuditEventList(events), format)
        }
        AuditCmd::Report { since, until } => {
            let report = ctx.store.audit().generate_report(since, until);
            print(&report, format)
        }
    }
}
