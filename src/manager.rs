//! The general manager: top-level router and escalation authority.
//!
//! One manager instance is one conversation session. It owns the specialist
//! agents, the safety monitor, the task delegator with its worker roster,
//! the task-agent registry, and the active conversation stage tree. Agents
//! never hold a reference back to the manager; results flow upward only.
//!
//! Every routing decision is audited through the digital twin before the
//! result is returned, so the audit log is a complete trace of the
//! session's orchestration decisions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::agents::{spawn, AgentStatus, Capability, SubAgent, TaskAgent};
use crate::completion::CompletionProvider;
use crate::config::{OrchestratorConfig, DEFAULT_DENY_TOKEN};
use crate::delegation::{Task, TaskDelegator};
use crate::errors::OrchestrationError;
use crate::safety::{SafetyMonitor, SafetyVerdict};
use crate::stages::{ConversationStageTree, Stage, StageTreeSnapshot};
use crate::twin::{DigitalTwin, Severity};

/// How an utterance was classified by the routing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Fact,
    Procedure,
    Reasoning,
    /// No trigger matched. A defined terminal outcome, not an error.
    Unclassified,
}

impl Classification {
    fn from_capability(capability: Capability) -> Self {
        match capability {
            Capability::Fact => Classification::Fact,
            Capability::Procedure => Classification::Procedure,
            Capability::Reasoning => Classification::Reasoning,
            _ => Classification::Unclassified,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Classification::Fact => "fact",
            Classification::Procedure => "procedure",
            Classification::Reasoning => "reasoning",
            Classification::Unclassified => "unclassified",
        };
        write!(f, "{tag}")
    }
}

/// Result of one `route` call.
///
/// Callers always receive one of these; routing never surfaces a raw
/// agent failure. For an unclassified utterance `text` carries the original
/// utterance and `source_agent` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    /// Response text, alert text, or the original utterance.
    pub text: String,
    /// Name of the agent that produced `text`, when one did.
    pub source_agent: Option<String>,
    /// Outcome of the classification policy.
    pub classification: Classification,
}

/// Handle to a registered task-bound agent.
///
/// Cheap to clone; clones refer to the same underlying agent. Obtained from
/// [`GeneralManager::create_agent`], which is idempotent per task string.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    agent: Arc<TaskAgent>,
    twin: Arc<DigitalTwin>,
}

impl AgentHandle {
    /// Invoke the bound task against `input`.
    pub fn handle_task(&self, input: &str) -> String {
        let response = self.agent.perform(input);
        self.twin.record(
            self.agent.name(),
            format!("performed bound task for input: {input}"),
            Severity::Info,
        );
        response
    }

    /// Name of the underlying agent.
    pub fn name(&self) -> &str {
        self.agent.name()
    }

    /// Status of the underlying agent.
    pub fn status(&self) -> AgentStatus {
        self.agent.status()
    }
}

/// Top-level coordinator for one conversation session.
pub struct GeneralManager {
    config: OrchestratorConfig,
    twin: Arc<DigitalTwin>,
    specialists: HashMap<Capability, Arc<dyn SubAgent>>,
    safety: Arc<SafetyMonitor>,
    delegator: TaskDelegator,
    task_agents: DashMap<String, AgentHandle>,
    tree: RwLock<ConversationStageTree>,
}

impl fmt::Debug for GeneralManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralManager")
            .field("name", &self.config.name)
            .field("specialists", &self.specialists.len())
            .field("workers", &self.delegator.roster_len())
            .field("task_agents", &self.task_agents.len())
            .finish_non_exhaustive()
    }
}

impl GeneralManager {
    /// Create a session with the given policy, completion backend, and
    /// audit twin. All agents the session will ever use are created here
    /// and reused for the session's lifetime.
    pub fn new(
        config: OrchestratorConfig,
        provider: Arc<dyn CompletionProvider>,
        twin: Arc<DigitalTwin>,
    ) -> Self {
        let mut specialists: HashMap<Capability, Arc<dyn SubAgent>> = HashMap::new();
        for (capability, name) in [
            (Capability::Fact, "What Agent"),
            (Capability::Procedure, "How Agent"),
            (Capability::Reasoning, "Why Agent"),
        ] {
            specialists.insert(
                capability,
                spawn(capability, name, Arc::clone(&provider), Arc::clone(&twin)),
            );
        }

        let workers: Vec<Arc<dyn SubAgent>> = (0..config.worker_count)
            .map(|i| {
                let label = if i < 26 {
                    ((b'A' + i as u8) as char).to_string()
                } else {
                    (i + 1).to_string()
                };
                spawn(
                    Capability::Worker,
                    format!("Worker Agent {label}"),
                    Arc::clone(&provider),
                    Arc::clone(&twin),
                )
            })
            .collect();
        let delegator = TaskDelegator::new(workers, Arc::clone(&twin));

        let safety = Arc::new(SafetyMonitor::new(
            "Main Safety Agent",
            config.denylist.clone(),
            Arc::clone(&twin),
        ));

        twin.record(
            &config.name,
            format!(
                "session initialized: {} specialists, {} workers",
                specialists.len(),
                config.worker_count
            ),
            Severity::Info,
        );
        log::info!(
            "orchestrator '{}' initialized with {} workers",
            config.name,
            config.worker_count
        );

        Self {
            config,
            twin,
            specialists,
            safety,
            delegator,
            task_agents: DashMap::new(),
            tree: RwLock::new(ConversationStageTree::new()),
        }
    }

    /// The twin this session reports to.
    pub fn twin(&self) -> Arc<DigitalTwin> {
        Arc::clone(&self.twin)
    }

    /// Classify an utterance with the ordered trigger policy. First
    /// containment match wins; no match means unclassified.
    fn classify(&self, utterance: &str) -> Option<Capability> {
        let lowered = utterance.to_lowercase();
        self.config
            .triggers
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, capability)| *capability)
    }

    /// Route an utterance to the matching specialist.
    ///
    /// Exactly one audit record is emitted per call, before returning,
    /// whatever the outcome. A failing or timed-out specialist is escalated
    /// to the safety monitor, whose response becomes the final result; the
    /// escalation happens once and the original request is never retried.
    pub async fn route(&self, utterance: &str) -> RouteResult {
        let Some(capability) = self.classify(utterance) else {
            self.twin.record(
                &self.config.name,
                format!("no agent found for utterance: {utterance}"),
                Severity::Info,
            );
            log::info!("utterance left unclassified");
            return RouteResult {
                text: utterance.to_string(),
                source_agent: None,
                classification: Classification::Unclassified,
            };
        };
        let classification = Classification::from_capability(capability);

        let Some(agent) = self.specialists.get(&capability) else {
            // A trigger pointing at an unstaffed capability is a config
            // mistake; treat it like an unclassified utterance.
            self.twin.record(
                &self.config.name,
                format!("no '{capability}' specialist registered for utterance: {utterance}"),
                Severity::Info,
            );
            return RouteResult {
                text: utterance.to_string(),
                source_agent: None,
                classification: Classification::Unclassified,
            };
        };

        agent.set_status(AgentStatus::Working);
        let outcome =
            match tokio::time::timeout(self.config.agent_timeout, agent.handle(utterance)).await {
                Ok(result) => result,
                Err(_) => Err(OrchestrationError::AgentTimeout {
                    agent: agent.name().to_string(),
                    timeout_ms: self.config.agent_timeout.as_millis() as u64,
                }),
            };

        match outcome {
            Ok(text) => {
                agent.set_status(AgentStatus::Idle);
                self.twin.record(
                    agent.name(),
                    format!("handled '{classification}' utterance"),
                    Severity::Info,
                );
                RouteResult {
                    text,
                    source_agent: Some(agent.name().to_string()),
                    classification,
                }
            }
            Err(err) => {
                agent.set_status(AgentStatus::Error);
                self.twin.record(agent.name(), err.to_string(), Severity::Error);
                let verdict = self.escalate(&err);
                RouteResult {
                    text: SafetyMonitor::describe(&verdict),
                    source_agent: Some(self.safety.name().to_string()),
                    classification,
                }
            }
        }
    }

    /// Hand a failure to the safety monitor.
    ///
    /// The report is branded with the primary denylist token so escalated
    /// failures always raise the alert.
    fn escalate(&self, failure: &OrchestrationError) -> SafetyVerdict {
        let brand = self
            .config
            .denylist
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_DENY_TOKEN.to_string());
        let report = format!("{brand} outcome escalated for review: {failure}");
        log::warn!("escalating to {}: {failure}", self.safety.name());
        self.safety.inspect(&report)
    }

    /// Register a task-bound agent and its paired twin shadow entry.
    ///
    /// Idempotent per distinct task string: re-registering returns the
    /// existing handle instead of creating a duplicate agent.
    pub fn create_agent(&self, task: &str) -> AgentHandle {
        let entry = self.task_agents.entry(task.to_string()).or_insert_with(|| {
            let agent = Arc::new(TaskAgent::new(task));
            self.twin.record(
                &self.config.name,
                format!("registered task agent for: {task}"),
                Severity::Info,
            );
            self.twin.sync_state(agent.name(), "registered");
            log::debug!("registered task agent for '{task}'");
            AgentHandle {
                agent,
                twin: Arc::clone(&self.twin),
            }
        });
        entry.value().clone()
    }

    /// Screen content against the session denylist.
    pub fn monitor_safety(&self, content: &str) -> SafetyVerdict {
        self.safety.inspect(content)
    }

    /// Formulate a task from an instruction and delegate it to the worker
    /// pool.
    ///
    /// A worker failure is escalated to the safety monitor and the alert
    /// becomes the task result. An empty roster is a structural
    /// misconfiguration and is surfaced to the caller unmasked.
    pub async fn delegate(
        &self,
        instruction: &str,
        utterance: &str,
    ) -> Result<Task, OrchestrationError> {
        let mut task = self.delegator.formulate(instruction, utterance);
        match self.delegator.delegate(&mut task).await {
            Ok(_) => Ok(task),
            Err(OrchestrationError::NoWorkersAvailable) => {
                Err(OrchestrationError::NoWorkersAvailable)
            }
            Err(err) => {
                let verdict = self.escalate(&err);
                task.result = Some(SafetyMonitor::describe(&verdict));
                Ok(task)
            }
        }
    }

    /// Direct access to the delegator, for roster administration.
    pub fn delegator(&self) -> &TaskDelegator {
        &self.delegator
    }

    // -----------------------------------------------------------------------
    // Conversation stage surface
    // -----------------------------------------------------------------------

    /// Start a conversation on the canonical seven-stage tree. Any previous
    /// conversation state is discarded.
    pub fn begin_conversation(&self) -> Stage {
        *self.tree.write() = ConversationStageTree::standard();
        self.twin.record(
            &self.config.name,
            "conversation started at Seed of Inquiry",
            Severity::Info,
        );
        Stage::SeedOfInquiry
    }

    /// Prompt and guidance of the active stage.
    pub fn stage_prompt(&self) -> Result<(String, String), OrchestrationError> {
        let tree = self.tree.read();
        let stage = tree.active_stage()?;
        Ok((stage.prompt().to_string(), stage.guidance().to_string()))
    }

    /// Store the user's response on the active stage node.
    pub fn capture_stage_response(&self, text: &str) -> Result<(), OrchestrationError> {
        self.tree.write().capture_response(text)?;
        self.twin.record(
            &self.config.name,
            "captured stage response",
            Severity::Info,
        );
        Ok(())
    }

    /// Advance the conversation to the next stage. At the terminal stage
    /// this is a no-op returning the terminal stage.
    pub fn advance_stage(&self) -> Result<Stage, OrchestrationError> {
        let stage = self.tree.write().advance()?.stage;
        self.twin.record(
            &self.config.name,
            format!("conversation advanced to: {stage}"),
            Severity::Info,
        );
        Ok(stage)
    }

    /// Snapshot of the conversation tree for external persistence or
    /// visualization.
    pub fn conversation_snapshot(&self) -> Result<StageTreeSnapshot, OrchestrationError> {
        self.tree.read().to_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CannedCompletion, CompletionError};
    use crate::twin::Finding;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug)]
    struct ExplodingCompletion;

    #[async_trait]
    impl CompletionProvider for ExplodingCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Backend("model offline".to_string()))
        }
    }

    #[derive(Debug)]
    struct StallingCompletion;

    #[async_trait]
    impl CompletionProvider for StallingCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    fn manager_with(provider: Arc<dyn CompletionProvider>) -> GeneralManager {
        GeneralManager::new(
            OrchestratorConfig::default(),
            provider,
            Arc::new(DigitalTwin::new()),
        )
    }

    #[tokio::test]
    async fn fact_trigger_routes_to_the_what_agent() {
        let manager = manager_with(Arc::new(CannedCompletion::with_reply(
            "Composting recycles organic waste.",
        )));
        let result = manager.route("what is composting").await;
        assert_eq!(result.classification, Classification::Fact);
        assert_eq!(result.source_agent.as_deref(), Some("What Agent"));
        assert_eq!(result.text, "Composting recycles organic waste.");
    }

    #[tokio::test]
    async fn first_trigger_match_wins() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        // Contains both "what" and "why"; "what" is first in the policy.
        let result = manager.route("what is compost and why use it").await;
        assert_eq!(result.classification, Classification::Fact);
        assert_eq!(result.source_agent.as_deref(), Some("What Agent"));
    }

    #[tokio::test]
    async fn each_trigger_reaches_its_own_specialist() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        for (utterance, agent) in [
            ("what is mulch", "What Agent"),
            ("how do i start a compost heap", "How Agent"),
            ("why does soil need worms", "Why Agent"),
        ] {
            let result = manager.route(utterance).await;
            assert_eq!(result.source_agent.as_deref(), Some(agent));
        }
    }

    #[tokio::test]
    async fn unclassified_utterance_is_a_defined_outcome() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        let before = manager.twin().len();
        let result = manager.route("tell me a story").await;
        assert_eq!(result.classification, Classification::Unclassified);
        assert_eq!(result.source_agent, None);
        assert_eq!(result.text, "tell me a story");
        // Exactly one audit record for the call.
        assert_eq!(manager.twin().len(), before + 1);
    }

    #[tokio::test]
    async fn agent_failure_escalates_to_the_safety_monitor() {
        let manager = manager_with(Arc::new(ExplodingCompletion));
        let result = manager.route("what is trigger-fail").await;

        assert_eq!(result.text, crate::safety::ALERT_TEXT);
        assert_eq!(result.source_agent.as_deref(), Some("Main Safety Agent"));
        assert_eq!(result.classification, Classification::Fact);

        let records = manager.twin().records();
        let errors: Vec<_> = records
            .iter()
            .filter(|r| r.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].actor, "What Agent");
        let escalations: Vec<_> = records
            .iter()
            .filter(|r| r.actor == "Main Safety Agent")
            .collect();
        assert_eq!(escalations.len(), 1);
    }

    #[tokio::test]
    async fn timeout_is_escalated_like_any_failure() {
        let mut config = OrchestratorConfig::default();
        config.agent_timeout = Duration::from_millis(20);
        let manager = GeneralManager::new(
            config,
            Arc::new(StallingCompletion),
            Arc::new(DigitalTwin::new()),
        );

        let result = manager.route("how slow can you be").await;
        assert_eq!(result.text, crate::safety::ALERT_TEXT);
        assert_eq!(result.source_agent.as_deref(), Some("Main Safety Agent"));

        let records = manager.twin().records();
        assert!(records
            .iter()
            .any(|r| r.severity == Severity::Error && r.action.contains("timed out")));
    }

    #[tokio::test]
    async fn unrecovered_failure_shows_up_in_the_bug_hunt() {
        let manager = manager_with(Arc::new(ExplodingCompletion));
        manager.route("what is broken").await;
        let findings: Vec<Finding> = manager.twin().bug_hunt().collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].actor, "What Agent");
    }

    #[tokio::test]
    async fn concurrent_routes_are_all_audited() {
        let manager = Arc::new(manager_with(Arc::new(CannedCompletion::new())));
        let before = manager.twin().len();
        let calls = (0..8).map(|i| {
            let manager = Arc::clone(&manager);
            async move {
                manager.route(&format!("what is item {i}")).await;
            }
        });
        futures::future::join_all(calls).await;
        assert_eq!(manager.twin().len(), before + 8);
    }

    #[test]
    fn create_agent_is_idempotent_per_task_string() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        let first = manager.create_agent("T1");
        let second = manager.create_agent("T1");
        assert!(Arc::ptr_eq(&first.agent, &second.agent));

        let other = manager.create_agent("T2");
        assert!(!Arc::ptr_eq(&first.agent, &other.agent));
    }

    #[test]
    fn task_handles_answer_with_their_bound_task() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        let handle = manager.create_agent("Sort the recycling");
        let response = handle.handle_task("bottles and cans");
        assert_eq!(
            response,
            "Handling task: Sort the recycling for input: bottles and cans"
        );
        assert_eq!(handle.status(), AgentStatus::Idle);
    }

    #[test]
    fn monitor_safety_matches_the_product_examples() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        assert!(manager.monitor_safety("this script is unsafe").flagged);
        assert!(!manager.monitor_safety("all clear").flagged);
    }

    #[tokio::test]
    async fn delegate_runs_tasks_through_the_worker_pool() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        let task = manager
            .delegate("Analyze dataset X", "please analyze dataset X")
            .await
            .unwrap();
        assert_eq!(task.assigned_to.as_deref(), Some("Worker Agent A"));
        assert!(task.result.unwrap().contains("Analyze dataset X"));
    }

    #[tokio::test]
    async fn empty_roster_surfaces_unmasked() {
        let mut config = OrchestratorConfig::default();
        config.worker_count = 0;
        let manager = GeneralManager::new(
            config,
            Arc::new(CannedCompletion::new()),
            Arc::new(DigitalTwin::new()),
        );
        let err = manager.delegate("job", "utterance").await.unwrap_err();
        assert_eq!(err, OrchestrationError::NoWorkersAvailable);
    }

    #[test]
    fn stage_surface_requires_a_started_conversation() {
        let manager = manager_with(Arc::new(CannedCompletion::new()));
        assert_eq!(
            manager.stage_prompt().unwrap_err(),
            OrchestrationError::TreeNotBuilt
        );

        manager.begin_conversation();
        let (prompt, guidance) = manager.stage_prompt().unwrap();
        assert_eq!(prompt, Stage::SeedOfInquiry.prompt());
        assert_eq!(guidance, Stage::SeedOfInquiry.guidance());

        manager.capture_stage_response("composting").unwrap();
        assert_eq!(
            manager.advance_stage().unwrap(),
            Stage::BranchesOfUnderstanding
        );

        let snapshot = manager.conversation_snapshot().unwrap();
        assert_eq!(snapshot.root.response.as_deref(), Some("composting"));
        assert_eq!(snapshot.active_stage, Stage::BranchesOfUnderstanding);
    }
}
