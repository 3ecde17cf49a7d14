//! Built-in agent implementations.
//!
//! One specialist type covers the fact/procedure/reasoning categories; the
//! difference between them is the briefing baked into the prompt, not a
//! subclass. Task and worker agents answer deterministically and never
//! consult the completion backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AgentStatus, Capability, StatusCell, SubAgent};
use crate::completion::CompletionProvider;
use crate::errors::OrchestrationError;

/// A completion-backed specialist for one routed response category.
#[derive(Debug)]
pub struct SpecialistAgent {
    name: String,
    capability: Capability,
    status: StatusCell,
    provider: Arc<dyn CompletionProvider>,
}

impl SpecialistAgent {
    pub fn new(
        name: impl Into<String>,
        capability: Capability,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            status: StatusCell::default(),
            provider,
        }
    }

    fn briefing(&self) -> &'static str {
        match self.capability {
            Capability::Fact => {
                "Answer the 'what' of the inquiry: name the topic and state the established facts."
            }
            Capability::Procedure => {
                "Answer the 'how' of the inquiry: lay out the concrete steps the user can take."
            }
            Capability::Reasoning => {
                "Answer the 'why' of the inquiry: explain the causes, motivations and connections."
            }
            _ => "Respond helpfully to the inquiry.",
        }
    }
}

#[async_trait]
impl SubAgent for SpecialistAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn status(&self) -> AgentStatus {
        self.status.get()
    }

    fn set_status(&self, status: AgentStatus) {
        self.status.set(status);
    }

    async fn handle(&self, input: &str) -> Result<String, OrchestrationError> {
        let prompt = format!(
            "You are {name}, a specialist of the Eco-Bot sustainability companion. {briefing}\n\nInquiry: {input}",
            name = self.name,
            briefing = self.briefing(),
        );
        self.provider
            .complete(&prompt)
            .await
            .map_err(|err| OrchestrationError::AgentFailure {
                agent: self.name.clone(),
                message: err.to_string(),
            })
    }
}

/// An agent bound to one registered task string.
#[derive(Debug)]
pub struct TaskAgent {
    name: String,
    task: String,
    status: StatusCell,
}

impl TaskAgent {
    pub fn new(task: impl Into<String>) -> Self {
        let task = task.into();
        Self {
            name: format!("Task Agent ({task})"),
            task,
            status: StatusCell::default(),
        }
    }

    /// The task string this agent was registered for.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Perform the bound task against one input.
    pub fn perform(&self, input: &str) -> String {
        self.status.set(AgentStatus::Working);
        let response = format!("Handling task: {} for input: {}", self.task, input);
        self.status.set(AgentStatus::Idle);
        response
    }
}

#[async_trait]
impl SubAgent for TaskAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Task
    }

    fn status(&self) -> AgentStatus {
        self.status.get()
    }

    fn set_status(&self, status: AgentStatus) {
        self.status.set(status);
    }

    async fn handle(&self, input: &str) -> Result<String, OrchestrationError> {
        Ok(self.perform(input))
    }
}

/// A pool worker. Optionally carries a speciality label.
#[derive(Debug)]
pub struct WorkerAgent {
    name: String,
    speciality: Option<String>,
    status: StatusCell,
}

impl WorkerAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speciality: None,
            status: StatusCell::default(),
        }
    }

    pub fn with_speciality(name: impl Into<String>, speciality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speciality: Some(speciality.into()),
            status: StatusCell::default(),
        }
    }
}

#[async_trait]
impl SubAgent for WorkerAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Worker
    }

    fn status(&self) -> AgentStatus {
        self.status.get()
    }

    fn set_status(&self, status: AgentStatus) {
        self.status.set(status);
    }

    async fn handle(&self, input: &str) -> Result<String, OrchestrationError> {
        let response = match &self.speciality {
            Some(speciality) => {
                format!("{} ({speciality}) acknowledges task: {input}", self.name)
            }
            None => format!("{} acknowledges task: {input}", self.name),
        };
        Ok(response)
    }
}
