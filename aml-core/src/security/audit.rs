//! Append-only audit logging.
//!
//! Events are buffered in memory and flushed to `audit-<timestamp>.json`
//! files, either when the buffer reaches a size threshold or on an explicit
//! flush. A flush failure is logged and swallowed rather than propagated —
//! the operation the event describes has already happened and must not be
//! rolled back because its audit trail couldn't be written.

use crate::error::Result;
use crate::types::{AgentName, ProjectId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The kind of action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A read of pattern/solution/decision/global data.
    Read,
    /// A create or update.
    Write,
    /// A delete.
    Delete,
    /// Access was evaluated and denied.
    AccessDenied,
    /// A backup or restore operation.
    Backup,
    /// A configuration change.
    Config,
}

/// One audited action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id.
    pub id: Uuid,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// The kind of action.
    pub event_type: AuditEventType,
    /// Agent the action was performed as, if any.
    pub agent: Option<AgentName>,
    /// Project the action was scoped to.
    pub project: Option<ProjectId>,
    /// Short description of the action (e.g. `"pattern.delete"`).
    pub action: String,
    /// Id of the resource acted on, if applicable.
    pub resource_id: Option<Uuid>,
    /// Type of the resource acted on (e.g. `"pattern"`).
    pub resource_type: Option<String>,
    /// Whether the action succeeded.
    pub success: bool,
    /// Error kind tag, if the action failed.
    pub error: Option<String>,
    /// Extra structured context.
    pub metadata: Option<JsonValue>,
    /// Calling user id, if the action came through an authenticated principal.
    pub user_id: Option<String>,
}

/// A filter for [`AuditLogger::query`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Restrict to events after this time, inclusive.
    pub since: Option<DateTime<Utc>>,
    /// Restrict to events before this time, inclusive.
    pub until: Option<DateTime<Utc>>,
    /// Restrict to events for this agent.
    pub agent: Option<AgentName>,
    /// Restrict to events of this type.
    pub event_type: Option<AuditEventType>,
    /// Restrict to failed events only.
    pub failures_only: bool,
}

impl AuditFilter {
    fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if event.agent.as_ref() != Some(agent) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if self.failures_only && event.success {
            return false;
        }
        true
    }
}

/// Summary counts produced by [`AuditLogger::generate_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Window start.
    pub since: DateTime<Utc>,
    /// Window end.
    pub until: DateTime<Utc>,
    /// Total events in the window.
    pub total_events: usize,
    /// Events where `success == false`.
    pub failure_count: usize,
    /// Events of type `AccessDenied`.
    pub access_denied_count: usize,
    /// Events of type `Delete`.
    pub delete_count: usize,
}

const DEFAULT_FLUSH_THRESHOLD: usize = 500;

struct AuditLoggerInner {
    buffer: Vec<AuditEvent>,
    flushed: Vec<AuditEvent>,
    flush_threshold: usize,
    log_dir: PathBuf,
}

/// Buffered append-only audit log writer.
pub struct AuditLogger {
    inner: Mutex<AuditLoggerInner>,
}

impl AuditLogger {
    /// Creates a logger that flushes JSON files into `log_dir`.
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self::with_flush_threshold(log_dir, DEFAULT_FLUSH_THRESHOLD)
    }

    /// Creates a logger with an explicit in-memory flush threshold, mainly
    /// for tests that want to force a flush without 500 events.
    #[must_use]
    pub fn with_flush_threshold(log_dir: impl Into<PathBuf>, flush_threshold: usize) -> Self {
        Self {
            inner: Mutex::new(AuditLoggerInner {
                    buffer: Vec::new(),
                    flushed: Vec::new(),
                    flush_threshold,
                    log_dir: log_dir.into(),
            }),
        }
    }

    /// Appends `event` to the in-memory buffer, flushing to disk if the
    /// buffer has reached its threshold. Flush failures are logged, not
    /// propagated ( "a failed audit write must never block the
    /// operation it describes").
    pub fn record(&self, event: AuditEvent) {
        let mut inner = self.inner.lock();
        inner.buffer.push(event);
        if inner.buffer.len() >= inner.flush_threshold {
            if let Err(err) = flush_locked(&mut inner) {
                tracing::warn!(error = %err, "audit log flush failed, buffer retained in memory");
            }
        }
    }

    /// Forces an immediate flush of any buffered events, e.g. on shutdown.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        flush_locked(&mut inner)
    }

    /// Returns events matching `filter`, across flushed and buffered events.
    #[must_use]
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditEvent> {
        let inner = self.inner.lock();
        inner
        .flushed
        .iter()
        .chain(inner.buffer.iter())
        .filter(|event| filter.matches(event))
        .cloned()
        .collect()
    }

    /// Summarizes events in `[since, until]`.
    #[must_use]
    pub fn generate_report(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> AuditReport {
        let events = self.query(&AuditFilter {
                since: Some(since),
                until: Some(until),
                ..Default::default()
        });
        let failure_count = events.iter().filter(|e| !e.success).count();
        let access_denied_count = events
        .iter()
        .filter(|e| e.event_type == AuditEventType::AccessDenied)
        .count();
        let delete_count = events
        .iter()
        .filter(|e| e.event_type == AuditEventType::Delete)
        .count();
        AuditReport {
            since,
            until,
            total_events: events.len(),
            failure_count,
            access_denied_count,
            delete_count,
        }
    }

    /// Deletes on-disk audit log files whose embedded timestamp is older
    /// than `retention_days`. Best-effort: unreadable filenames are skipped.
    pub fn delete_old_logs(&self, retention_days: i64) -> Result<usize> {
        let inner = self.inner.lock();
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let mut removed = 0;
        if !inner.log_dir.exists() {
            return Ok(0);
        }
        for entry in fs::read_dir(&inner.log_dir)? {
            let entry = entry?;
            let path = entry.path();
            if let Some(timestamp) = extract_log_timestamp(&path) {
                if timestamp < cutoff {
                    fs::remove_file(&path)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn flush_locked(inner: &mut AuditLoggerInner) -> Result<()> {
    if inner.buffer.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(&inner.log_dir)?;
    let batch: Vec<AuditEvent> = inner.buffer.drain(..).collect();
    let filename = format!("audit-{}.json", Utc::now().timestamp_nanos_opt().unwrap_or(0));
    let path = inner.log_dir.join(filename);
    let json = serde_json::to_vec_pretty(&batch)?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        use std::io::Write;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, &path)?;

    inner.flushed.extend(batch);
    Ok(())
}

fn extract_log_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let stem = path.file_stem()?.to_str()?;
    let nanos: i64 = stem.strip_prefix("audit-")?.parse().ok()?;
    DateTime::from_timestamp_nanos(nanos).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: AuditEventType, success: bool) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            agent: Some("agent-1".into()),
            project: Some("proj-1".into()),
            action: "pattern.write".to_string(),
            resource_id: None,
            resource_type: Some("pattern".to_string()),
            success,
            error: None,
            metadata: None,
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn records_stay_queryable_before_flush() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = AuditLogger::new(dir.path());
        logger.record(event(AuditEventType::Write, true));
        let results = logger.query(&AuditFilter::default());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn flush_writes_a_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = AuditLogger::new(dir.path());
        logger.record(event(AuditEventType::Write, true));
        logger.flush().expect("flush");
        let entries: Vec<_> = fs::read_dir(dir.path()).expect("read_dir").collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn auto_flushes_at_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = AuditLogger::with_flush_threshold(dir.path(), 3);
        for _ in 0..3 {
            logger.record(event(AuditEventType::Read, true));
        }
        let entries: Vec<_> = fs::read_dir(dir.path()).expect("read_dir").collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn report_counts_failures_and_deletes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = AuditLogger::new(dir.path());
        logger.record(event(AuditEventType::Write, true));
        logger.record(event(AuditEventType::Delete, true));
        logger.record(event(AuditEventType::AccessDenied, false));
        let report = logger.generate_report(
            Utc::now() - chrono::Duration::minutes(1),
            Utc::now() + chrono::Duration::minutes(1),
        );
        assert_eq!(report.total_events, 3);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.access_denied_count, 1);
        assert_eq!(report.delete_count, 1);
    }

    #[test]
    fn filter_by_agent_excludes_other_agents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = AuditLogger::new(dir.path());
        logger.record(event(AuditEventType::Write, true));
        let mut other = event(AuditEventType::Write, true);
        other.agent = Some("agent-2".into());
        logger.record(other);

        let results = logger.query(&AuditFilter {
                agent: Some("agent-1".into()),
                ..Default::default()
        });
        assert_eq!(results.len(), 1);
    }
}
