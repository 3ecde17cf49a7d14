//! Sub-agent contract and the closed agent factory.
//!
//! Every specialized behavior in the core is one implementation of the
//! [`SubAgent`] trait, distinguished by a [`Capability`] tag rather than an
//! inheritance hierarchy. New agents are created only through [`spawn`],
//! a constructor map closed over the capability enum, so no user-supplied
//! text can ever select an arbitrary code path.

pub mod builtin;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionProvider;
use crate::errors::OrchestrationError;
use crate::safety::SafetyMonitor;
use crate::twin::DigitalTwin;

pub use builtin::{SpecialistAgent, TaskAgent, WorkerAgent};

/// Response category a sub-agent specializes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Answers "what" inquiries with established facts.
    Fact,
    /// Answers "how" inquiries with concrete steps.
    Procedure,
    /// Answers "why" inquiries with causes and connections.
    Reasoning,
    /// Bound to a single registered task string.
    Task,
    /// Screens content against the denylist.
    Safety,
    /// Accepts delegated tasks from the rotation.
    Worker,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Capability::Fact => "fact",
            Capability::Procedure => "procedure",
            Capability::Reasoning => "reasoning",
            Capability::Task => "task",
            Capability::Safety => "safety",
            Capability::Worker => "worker",
        };
        write!(f, "{tag}")
    }
}

/// Lifecycle status of an agent.
///
/// Mutated only by the orchestrator or by the agent's own completion path;
/// agents are created once per session and reused, never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    Error,
}

/// Shared, lock-free status cell.
#[derive(Debug, Default)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn get(&self) -> AgentStatus {
        match self.0.load(Ordering::Relaxed) {
            1 => AgentStatus::Working,
            2 => AgentStatus::Error,
            _ => AgentStatus::Idle,
        }
    }

    pub fn set(&self, status: AgentStatus) {
        let code = match status {
            AgentStatus::Idle => 0,
            AgentStatus::Working => 1,
            AgentStatus::Error => 2,
        };
        self.0.store(code, Ordering::Relaxed);
    }
}

/// The single polymorphic agent contract.
///
/// An agent has a name (unique within one orchestrator), a capability tag,
/// a mutable status, and one operation: handle an input string. `handle`
/// may suspend while the agent consults an external completion backend;
/// callers bound it with a timeout and treat a timeout exactly like any
/// other failure.
#[async_trait]
pub trait SubAgent: Send + Sync + fmt::Debug {
    /// Agent name, unique within the owning orchestrator.
    fn name(&self) -> &str;

    /// The response category this agent covers.
    fn capability(&self) -> Capability;

    /// Current lifecycle status.
    fn status(&self) -> AgentStatus;

    /// Overwrite the lifecycle status.
    fn set_status(&self, status: AgentStatus);

    /// Handle one input, producing response text.
    async fn handle(&self, input: &str) -> Result<String, OrchestrationError>;
}

/// Construct an agent for `capability`.
///
/// This is the only way agents come into existence: a closed match over the
/// capability enum. For [`Capability::Task`], `name` doubles as the task
/// instruction the agent is bound to. The completion provider is consulted
/// only by the specialist capabilities; the twin is handed to the safety
/// monitor so flagged verdicts can be audited.
pub fn spawn(
    capability: Capability,
    name: impl Into<String>,
    provider: Arc<dyn CompletionProvider>,
    twin: Arc<DigitalTwin>,
) -> Arc<dyn SubAgent> {
    let name = name.into();
    match capability {
        Capability::Fact | Capability::Procedure | Capability::Reasoning => {
            Arc::new(SpecialistAgent::new(name, capability, provider))
        }
        Capability::Task => Arc::new(TaskAgent::new(name)),
        Capability::Safety => Arc::new(SafetyMonitor::new(
            name,
            vec![crate::config::DEFAULT_DENY_TOKEN.to_string()],
            twin,
        )),
        Capability::Worker => Arc::new(WorkerAgent::new(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CannedCompletion;

    #[test]
    fn status_cell_round_trips_all_states() {
        let cell = StatusCell::default();
        assert_eq!(cell.get(), AgentStatus::Idle);
        cell.set(AgentStatus::Working);
        assert_eq!(cell.get(), AgentStatus::Working);
        cell.set(AgentStatus::Error);
        assert_eq!(cell.get(), AgentStatus::Error);
        cell.set(AgentStatus::Idle);
        assert_eq!(cell.get(), AgentStatus::Idle);
    }

    #[test]
    fn spawn_honors_the_capability_tag() {
        let provider: Arc<dyn crate::completion::CompletionProvider> =
            Arc::new(CannedCompletion::new());
        let twin = Arc::new(DigitalTwin::new());
        for capability in [
            Capability::Fact,
            Capability::Procedure,
            Capability::Reasoning,
            Capability::Task,
            Capability::Safety,
            Capability::Worker,
        ] {
            let agent = spawn(
                capability,
                "probe",
                Arc::clone(&provider),
                Arc::clone(&twin),
            );
            assert_eq!(agent.capability(), capability);
            assert_eq!(agent.status(), AgentStatus::Idle);
        }
    }
}
