//! Digital twin: the append-only audit shadow of an orchestration session.
//!
//! Every component holds a write-only handle to the twin and reports each
//! action as it happens; nothing in the control flow ever reads the log
//! back. The twin also mirrors the last reported action per actor, giving
//! external monitors a live shadow of the component map, and can scan its
//! log for unrecovered failures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Severity of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// One appended audit entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Wall-clock time the action was recorded.
    pub timestamp: DateTime<Utc>,
    /// Component that performed the action.
    pub actor: String,
    /// Description of the action.
    pub action: String,
    /// Outcome severity.
    pub severity: Severity,
}

/// External persistence collaborator for audit records.
///
/// Appends are best-effort: a failing sink must never fail the recording
/// caller, so errors are swallowed and surfaced only through the log.
pub trait AuditSink: Send + Sync {
    /// Persist one record.
    fn append(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// An anomaly surfaced by [`DigitalTwin::bug_hunt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Actor whose failure was never followed by a recovery.
    pub actor: String,
    /// Action text of the failing record.
    pub action: String,
    /// Index of the failing record in the log at scan time.
    pub record_index: usize,
}

/// Number of subsequent records a recovery may arrive within before an
/// error counts as unrecovered.
pub const DEFAULT_RECOVERY_WINDOW: usize = 5;

static GLOBAL_TWIN: OnceCell<Arc<DigitalTwin>> = OnceCell::new();

/// Append-only audit shadow.
///
/// Appends are mutex-guarded and cheap; scans iterate over a snapshot so
/// readers never hold up writers. Recording never fails the caller.
#[derive(Default)]
pub struct DigitalTwin {
    records: RwLock<Vec<AuditRecord>>,
    shadow: RwLock<HashMap<String, String>>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl fmt::Debug for DigitalTwin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalTwin")
            .field("records", &self.records.read().len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl DigitalTwin {
    /// Create a twin with no external sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a twin that forwards each record to `sink` best-effort.
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            shadow: RwLock::new(HashMap::new()),
            sink: Some(sink),
        }
    }

    /// The process-wide twin shared by concurrent sessions.
    ///
    /// Sessions that want isolated logs construct their own twin instead.
    pub fn global() -> Arc<DigitalTwin> {
        Arc::clone(GLOBAL_TWIN.get_or_init(|| Arc::new(DigitalTwin::new())))
    }

    /// Append one audit record.
    ///
    /// A sink failure is reported on the diagnostic log channel and the
    /// record is kept in memory; the caller never observes the failure.
    pub fn record(&self, actor: &str, action: impl Into<String>, severity: Severity) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: action.into(),
            severity,
        };
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.append(&record) {
                log::warn!("audit sink unavailable, record kept in memory only: {err}");
            }
        }
        self.shadow
            .write()
            .insert(record.actor.clone(), record.action.clone());
        self.records.write().push(record);
    }

    /// Mirror an actor's state without appending an audit record.
    pub fn sync_state(&self, actor: &str, state: impl Into<String>) {
        self.shadow.write().insert(actor.to_string(), state.into());
    }

    /// Last reported action or synced state of `actor`.
    pub fn shadow_of(&self, actor: &str) -> Option<String> {
        self.shadow.read().get(actor).cloned()
    }

    /// Snapshot of the full log.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Scan the log for unrecovered failures.
    ///
    /// Yields a [`Finding`] for every `Error` record that is not followed,
    /// within [`DEFAULT_RECOVERY_WINDOW`] subsequent records, by an `Info`
    /// record from the same actor. The returned iterator is lazy over a
    /// snapshot taken at call time and never mutates the log; calling
    /// `bug_hunt` again restarts the scan.
    pub fn bug_hunt(&self) -> BugHunt {
        self.bug_hunt_with_window(DEFAULT_RECOVERY_WINDOW)
    }

    /// [`Self::bug_hunt`] with an explicit recovery window.
    pub fn bug_hunt_with_window(&self, window: usize) -> BugHunt {
        BugHunt {
            snapshot: self.records.read().clone(),
            cursor: 0,
            window,
        }
    }
}

/// Lazy scan over a log snapshot. See [`DigitalTwin::bug_hunt`].
#[derive(Debug, Clone)]
pub struct BugHunt {
    snapshot: Vec<AuditRecord>,
    cursor: usize,
    window: usize,
}

impl Iterator for BugHunt {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        while self.cursor < self.snapshot.len() {
            let index = self.cursor;
            self.cursor += 1;
            let record = &self.snapshot[index];
            if record.severity != Severity::Error {
                continue;
            }
            let recovered = self.snapshot[index + 1..]
                .iter()
                .take(self.window)
                .any(|later| later.severity == Severity::Info && later.actor == record.actor);
            if !recovered {
                return Some(Finding {
                    actor: record.actor.clone(),
                    action: record.action.clone(),
                    record_index: index,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn append(&self, _record: &AuditRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn record_appends_and_mirrors_the_actor() {
        let twin = DigitalTwin::new();
        twin.record("Worker Agent A", "completed task", Severity::Info);
        assert_eq!(twin.len(), 1);
        assert_eq!(
            twin.shadow_of("Worker Agent A").as_deref(),
            Some("completed task")
        );
    }

    #[test]
    fn sink_failure_never_reaches_the_caller() {
        let twin = DigitalTwin::with_sink(Arc::new(BrokenSink));
        twin.record("General Manager", "routing", Severity::Info);
        assert_eq!(twin.len(), 1);
    }

    #[test]
    fn bug_hunt_flags_an_unrecovered_error() {
        let twin = DigitalTwin::new();
        twin.record("What Agent", "handle failed", Severity::Error);
        twin.record("General Manager", "escalated", Severity::Info);

        let findings: Vec<Finding> = twin.bug_hunt().collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].actor, "What Agent");
        assert_eq!(findings[0].record_index, 0);
    }

    #[test]
    fn bug_hunt_accepts_a_same_actor_recovery() {
        let twin = DigitalTwin::new();
        twin.record("What Agent", "handle failed", Severity::Error);
        twin.record("What Agent", "handled 'fact' utterance", Severity::Info);

        assert_eq!(twin.bug_hunt().count(), 0);
    }

    #[test]
    fn bug_hunt_window_bounds_the_recovery_search() {
        let twin = DigitalTwin::new();
        twin.record("What Agent", "handle failed", Severity::Error);
        for _ in 0..3 {
            twin.record("General Manager", "unrelated", Severity::Info);
        }
        twin.record("What Agent", "recovered", Severity::Info);

        // Recovery arrives as the 4th subsequent record: inside the default
        // window, outside a window of 2.
        assert_eq!(twin.bug_hunt().count(), 0);
        assert_eq!(twin.bug_hunt_with_window(2).count(), 1);
    }

    #[test]
    fn bug_hunt_is_restartable() {
        let twin = DigitalTwin::new();
        twin.record("Worker Agent B", "task failed", Severity::Error);
        let first: Vec<Finding> = twin.bug_hunt().collect();
        let second: Vec<Finding> = twin.bug_hunt().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let twin = Arc::new(DigitalTwin::new());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let twin = Arc::clone(&twin);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    twin.record(
                        &format!("Worker Agent {worker}"),
                        format!("step {i}"),
                        Severity::Info,
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().expect("audit writer thread panicked");
        }
        assert_eq!(twin.len(), 400);
    }
}
