//! Error types for the orchestration core.

use thiserror::Error;

/// Failures surfaced by the orchestration core.
///
/// `GeneralManager::route` recovers `AgentFailure` and `AgentTimeout`
/// internally by escalating to the safety monitor; the structural variants
/// (`NoWorkersAvailable`, `TreeNotBuilt`) are returned to the caller
/// unmasked. An unclassified utterance is not an error and never appears
/// here; see [`crate::manager::Classification`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    /// A sub-agent returned an error while handling an utterance or task.
    #[error("agent '{agent}' failed: {message}")]
    AgentFailure { agent: String, message: String },

    /// A sub-agent did not answer within the configured deadline.
    /// Treated exactly like `AgentFailure` by the escalation path.
    #[error("agent '{agent}' timed out after {timeout_ms}ms")]
    AgentTimeout { agent: String, timeout_ms: u64 },

    /// The delegator's worker roster is empty. Fatal to the delegation
    /// call only; the roster may be replenished afterwards.
    #[error("no workers available to accept the task")]
    NoWorkersAvailable,

    /// A stage-tree operation was attempted before the tree was built.
    #[error("conversation stage tree has not been built")]
    TreeNotBuilt,
}
