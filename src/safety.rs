//! Safety monitoring.
//!
//! The monitor screens content against a configurable denylist with a
//! case-insensitive substring check. It is deterministic and side-effect
//! free apart from one audit entry when content is flagged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::{AgentStatus, Capability, StatusCell, SubAgent};
use crate::errors::OrchestrationError;
use crate::twin::{DigitalTwin, Severity};

/// Alert text returned for flagged content.
pub const ALERT_TEXT: &str = "Safety breach detected!";

/// Rendering of a clean verdict.
pub const ALL_CLEAR_TEXT: &str = "Script is safe";

/// Outcome of one safety inspection. Computed per inspected string and
/// never persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// Whether the content matched the denylist.
    pub flagged: bool,
    /// Alert text, present only when flagged.
    pub alert: Option<String>,
    /// The denylist term that matched, when flagged.
    pub matched: Option<String>,
}

/// Denylist-based content monitor.
#[derive(Debug)]
pub struct SafetyMonitor {
    name: String,
    denylist: Vec<String>,
    status: StatusCell,
    twin: Arc<DigitalTwin>,
}

impl SafetyMonitor {
    /// Create a monitor. Denylist terms are matched case-insensitively.
    pub fn new(name: impl Into<String>, denylist: Vec<String>, twin: Arc<DigitalTwin>) -> Self {
        Self {
            name: name.into(),
            denylist: denylist.into_iter().map(|t| t.to_lowercase()).collect(),
            status: StatusCell::default(),
            twin,
        }
    }

    /// Screen `content` against the denylist.
    pub fn inspect(&self, content: &str) -> SafetyVerdict {
        let lowered = content.to_lowercase();
        for term in &self.denylist {
            if lowered.contains(term.as_str()) {
                self.twin.record(
                    &self.name,
                    format!("flagged content matching '{term}'"),
                    Severity::Info,
                );
                return SafetyVerdict {
                    flagged: true,
                    alert: Some(ALERT_TEXT.to_string()),
                    matched: Some(term.clone()),
                };
            }
        }
        SafetyVerdict {
            flagged: false,
            alert: None,
            matched: None,
        }
    }

    /// Render a verdict as user-facing text.
    pub fn describe(verdict: &SafetyVerdict) -> String {
        verdict
            .alert
            .clone()
            .unwrap_or_else(|| ALL_CLEAR_TEXT.to_string())
    }
}

#[async_trait]
impl SubAgent for SafetyMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Safety
    }

    fn status(&self) -> AgentStatus {
        self.status.get()
    }

    fn set_status(&self, status: AgentStatus) {
        self.status.set(status);
    }

    async fn handle(&self, input: &str) -> Result<String, OrchestrationError> {
        Ok(Self::describe(&self.inspect(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> SafetyMonitor {
        SafetyMonitor::new(
            "Main Safety Agent",
            vec!["unsafe".to_string()],
            Arc::new(DigitalTwin::new()),
        )
    }

    #[test]
    fn flags_denylisted_content() {
        let monitor = monitor();
        let verdict = monitor.inspect("this script is unsafe");
        assert!(verdict.flagged);
        assert_eq!(verdict.alert.as_deref(), Some(ALERT_TEXT));
        assert_eq!(verdict.matched.as_deref(), Some("unsafe"));
    }

    #[test]
    fn clears_clean_content() {
        let monitor = monitor();
        let verdict = monitor.inspect("all clear");
        assert!(!verdict.flagged);
        assert_eq!(verdict.alert, None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let monitor = monitor();
        assert!(monitor.inspect("UNSAFE payload").flagged);
    }

    #[test]
    fn flagged_inspection_audits_once() {
        let twin = Arc::new(DigitalTwin::new());
        let monitor = SafetyMonitor::new(
            "Main Safety Agent",
            vec!["unsafe".to_string()],
            Arc::clone(&twin),
        );
        monitor.inspect("looks unsafe to me");
        monitor.inspect("perfectly fine");
        assert_eq!(twin.len(), 1);
    }

    #[test]
    fn describe_renders_both_outcomes() {
        let monitor = monitor();
        assert_eq!(
            SafetyMonitor::describe(&monitor.inspect("unsafe")),
            ALERT_TEXT
        );
        assert_eq!(
            SafetyMonitor::describe(&monitor.inspect("fine")),
            ALL_CLEAR_TEXT
        );
    }
}
