//! Task formulation and round-robin delegation.
//!
//! The delegator owns a fixed roster of worker agents and a rotation
//! cursor. Selection and rotation happen as one locked step, so concurrent
//! callers can never pick the same head worker, and every worker is
//! revisited only after every other worker has had a turn.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::{AgentStatus, SubAgent};
use crate::errors::OrchestrationError;
use crate::twin::{DigitalTwin, Severity};

/// A unit of delegated work.
///
/// Created by [`TaskDelegator::formulate`], mutated when assigned and when
/// completed, and discarded by the caller once the result is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: Uuid,
    /// The instruction handed to the worker.
    pub instruction: String,
    /// The utterance this task originated from.
    pub utterance: String,
    /// Name of the worker the task was assigned to, once delegated.
    pub assigned_to: Option<String>,
    /// The worker's response, once completed.
    pub result: Option<String>,
}

impl Task {
    /// Create an unassigned task.
    pub fn new(instruction: impl Into<String>, utterance: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            utterance: utterance.into(),
            assigned_to: None,
            result: None,
        }
    }
}

/// Round-robin task delegator over a fixed worker roster.
pub struct TaskDelegator {
    name: String,
    roster: Mutex<VecDeque<Arc<dyn SubAgent>>>,
    twin: Arc<DigitalTwin>,
}

impl fmt::Debug for TaskDelegator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDelegator")
            .field("name", &self.name)
            .field("roster_len", &self.roster.lock().len())
            .finish()
    }
}

impl TaskDelegator {
    /// Create a delegator with the given roster. The roster order is the
    /// initial rotation order.
    pub fn new(workers: Vec<Arc<dyn SubAgent>>, twin: Arc<DigitalTwin>) -> Self {
        Self {
            name: "Task Delegator".to_string(),
            roster: Mutex::new(workers.into()),
            twin,
        }
    }

    /// Formulate a task from an instruction and its originating utterance.
    pub fn formulate(&self, instruction: &str, utterance: &str) -> Task {
        let task = Task::new(instruction, utterance);
        log::debug!("formulated task {} from utterance", task.id);
        self.twin.record(
            &self.name,
            format!("formulated task {}: {instruction}", task.id),
            Severity::Info,
        );
        task
    }

    /// Current roster size.
    pub fn roster_len(&self) -> usize {
        self.roster.lock().len()
    }

    /// Append workers to the rotation. This is the external admin hook;
    /// the core itself never grows the roster.
    pub fn replenish(&self, workers: Vec<Arc<dyn SubAgent>>) {
        self.roster.lock().extend(workers);
    }

    /// Dispatch `task` to the worker at the head of the rotation and move
    /// that worker to the tail.
    ///
    /// Fails with `NoWorkersAvailable` when the roster is empty; the
    /// delegator itself stays usable. A worker failure is returned to the
    /// caller as-is, with the worker left in `Error` status and the failure
    /// audited.
    pub async fn delegate(&self, task: &mut Task) -> Result<String, OrchestrationError> {
        let selected = {
            let mut roster = self.roster.lock();
            match roster.pop_front() {
                Some(worker) => {
                    roster.push_back(Arc::clone(&worker));
                    Some(worker)
                }
                None => None,
            }
        };
        let Some(worker) = selected else {
            self.twin.record(
                &self.name,
                format!("delegation of task {} refused: roster is empty", task.id),
                Severity::Error,
            );
            return Err(OrchestrationError::NoWorkersAvailable);
        };

        task.assigned_to = Some(worker.name().to_string());
        worker.set_status(AgentStatus::Working);
        log::debug!("delegating task {} to {}", task.id, worker.name());

        match worker.handle(&task.instruction).await {
            Ok(text) => {
                worker.set_status(AgentStatus::Idle);
                task.result = Some(text.clone());
                self.twin.record(
                    worker.name(),
                    format!("completed task {}", task.id),
                    Severity::Info,
                );
                Ok(text)
            }
            Err(err) => {
                worker.set_status(AgentStatus::Error);
                self.twin.record(
                    worker.name(),
                    format!("task {} failed: {err}", task.id),
                    Severity::Error,
                );
                Err(err)
            }
        }
    }
}
