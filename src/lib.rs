//! # Eco-Bot orchestration core
//!
//! The agent-orchestration core of the Eco-Bot sustainability companion.
//! A [`GeneralManager`] classifies incoming utterances and routes them to
//! specialized sub-agents, delegates formulated tasks across a round-robin
//! worker pool, escalates failures to a safety monitor, and shadows every
//! decision through an append-only [`DigitalTwin`] audit log. Dialogue
//! progression follows the seven-stage Gaia-Bohm conversation tree
//! ([`ConversationStageTree`]).
//!
//! Transport, persistence and the language-model backend are external
//! collaborators: callers drive [`GeneralManager::route`] from whatever
//! surface they like, supply text completion through the
//! [`CompletionProvider`] trait, and receive audit records and stage-tree
//! snapshots as serializable values.

pub mod agents;
pub mod completion;
pub mod config;
pub mod delegation;
pub mod errors;
pub mod manager;
pub mod safety;
pub mod stages;
pub mod twin;

pub use agents::{AgentStatus, Capability, SubAgent};
pub use completion::{CannedCompletion, CompletionError, CompletionProvider};
pub use config::OrchestratorConfig;
pub use delegation::{Task, TaskDelegator};
pub use errors::OrchestrationError;
pub use manager::{AgentHandle, Classification, GeneralManager, RouteResult};
pub use safety::{SafetyMonitor, SafetyVerdict};
pub use stages::{
    ConversationStageTree, ConversationTurn, ResponseKind, Stage, StageNode, StageTreeSnapshot,
};
pub use twin::{AuditRecord, AuditSink, DigitalTwin, Finding, Severity};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
