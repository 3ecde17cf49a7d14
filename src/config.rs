//! Orchestrator configuration.
//!
//! All tunable policy lives here and is passed explicitly into the
//! [`crate::manager::GeneralManager`] constructor. There are no process-wide
//! configuration singletons.

use std::time::Duration;

use crate::agents::Capability;

/// The denylist token every default deployment screens for.
pub const DEFAULT_DENY_TOKEN: &str = "unsafe";

/// Configuration for one orchestrator session.
///
/// # Attributes
///
/// * `name` - Actor name the manager uses in audit records.
/// * `triggers` - Ordered classification policy: each entry is a lowercase
///   keyword and the capability it routes to. First containment match wins;
///   no match means the utterance is unclassified.
/// * `denylist` - Case-insensitive substrings the safety monitor flags.
/// * `agent_timeout` - Deadline for a single sub-agent `handle` call.
/// * `worker_count` - Size of the delegator's fixed worker roster.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Actor name used by the manager when it writes audit records.
    pub name: String,
    /// Ordered (keyword, capability) classification triggers.
    pub triggers: Vec<(String, Capability)>,
    /// Safety denylist, matched case-insensitively as substrings.
    pub denylist: Vec<String>,
    /// Deadline applied to every sub-agent call made by `route`.
    pub agent_timeout: Duration,
    /// Number of worker agents assigned to the delegator at construction.
    pub worker_count: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            name: "General Manager".to_string(),
            triggers: vec![
                ("what".to_string(), Capability::Fact),
                ("how".to_string(), Capability::Procedure),
                ("why".to_string(), Capability::Reasoning),
            ],
            denylist: vec![DEFAULT_DENY_TOKEN.to_string()],
            agent_timeout: Duration::from_secs(30),
            worker_count: 3,
        }
    }
}

impl OrchestratorConfig {
    /// Create a config with the default policy.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_triggers_are_ordered_what_how_why() {
        let config = OrchestratorConfig::default();
        let keywords: Vec<&str> = config.triggers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keywords, vec!["what", "how", "why"]);
    }

    #[test]
    fn default_denylist_contains_the_deny_token() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.denylist, vec![DEFAULT_DENY_TOKEN.to_string()]);
    }
}
