//! The Gaia-Bohm conversation stage tree.
//!
//! A dialogue progresses through seven named stages, each carrying a prompt
//! and guidance text. The default shape is a single-child chain walked
//! strictly forward; the node model supports branching for multi-path
//! dialogues, and the terminal stage absorbs repeated `advance` calls.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::OrchestrationError;

/// The seven dialogue stages, in progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SeedOfInquiry,
    BranchesOfUnderstanding,
    LeavesOfApplication,
    RootsOfConnection,
    ForestOfExploration,
    CanopyOfSynthesis,
    HarvestOfWisdom,
}

/// Expected shape of the user's reply at a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    OpenDialogue,
}

impl Stage {
    /// All stages in progression order.
    pub const SEQUENCE: [Stage; 7] = [
        Stage::SeedOfInquiry,
        Stage::BranchesOfUnderstanding,
        Stage::LeavesOfApplication,
        Stage::RootsOfConnection,
        Stage::ForestOfExploration,
        Stage::CanopyOfSynthesis,
        Stage::HarvestOfWisdom,
    ];

    /// The following stage, or `None` at the terminal stage.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::SeedOfInquiry => Some(Stage::BranchesOfUnderstanding),
            Stage::BranchesOfUnderstanding => Some(Stage::LeavesOfApplication),
            Stage::LeavesOfApplication => Some(Stage::RootsOfConnection),
            Stage::RootsOfConnection => Some(Stage::ForestOfExploration),
            Stage::ForestOfExploration => Some(Stage::CanopyOfSynthesis),
            Stage::CanopyOfSynthesis => Some(Stage::HarvestOfWisdom),
            Stage::HarvestOfWisdom => None,
        }
    }

    /// Whether this is the terminal stage.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::HarvestOfWisdom)
    }

    /// Display title of the stage.
    pub fn title(self) -> &'static str {
        match self {
            Stage::SeedOfInquiry => "Seed of Inquiry",
            Stage::BranchesOfUnderstanding => "Branches of Understanding",
            Stage::LeavesOfApplication => "Leaves of Application",
            Stage::RootsOfConnection => "Roots of Connection",
            Stage::ForestOfExploration => "Forest of Exploration",
            Stage::CanopyOfSynthesis => "Canopy of Synthesis",
            Stage::HarvestOfWisdom => "Harvest of Wisdom",
        }
    }

    /// The question posed to the user at this stage.
    pub fn prompt(self) -> &'static str {
        match self {
            Stage::SeedOfInquiry => {
                "What primary topic or question sparks your curiosity today?"
            }
            Stage::BranchesOfUnderstanding => {
                "As we delve into this topic, what related or sub-topics emerge?"
            }
            Stage::LeavesOfApplication => {
                "How might the knowledge from these topics be applied or observed in the world around us?"
            }
            Stage::RootsOfConnection => {
                "Digging deeper, what underlying connections link this to seemingly unrelated subjects?"
            }
            Stage::ForestOfExploration => {
                "Expanding our view, what other topics or fields intertwine with our primary topic?"
            }
            Stage::CanopyOfSynthesis => {
                "Reflecting on our exploration, how do the insights from various topics form a cohesive understanding?"
            }
            Stage::HarvestOfWisdom => {
                "What key insights have we gathered, and how might they enrich our approach to the initial inquiry?"
            }
        }
    }

    /// Facilitation guidance shown alongside the prompt.
    pub fn guidance(self) -> &'static str {
        match self {
            Stage::SeedOfInquiry => {
                "Feel free to express your initial thoughts and feelings toward this topic."
            }
            Stage::BranchesOfUnderstanding => {
                "Are there conflicting perspectives within these branches? Navigate them without judgment."
            }
            Stage::LeavesOfApplication => {
                "Share experiences or observations that resonate with you."
            }
            Stage::RootsOfConnection => {
                "Remain open to unexpected connections and explore them together."
            }
            Stage::ForestOfExploration => {
                "Reflect on the collective understanding so far. Are there societal or global implications?"
            }
            Stage::CanopyOfSynthesis => {
                "What new insights have emerged, and how do they resonate with your initial inquiry?"
            }
            Stage::HarvestOfWisdom => {
                "Reflect on the journey. How has the dialogue shaped your understanding?"
            }
        }
    }

    /// Expected response shape at this stage.
    pub fn response_kind(self) -> ResponseKind {
        ResponseKind::OpenDialogue
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// One turn of the conversation a tree is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub message: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            message: message.into(),
        }
    }
}

/// A node in the stage tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNode {
    /// Stage this node belongs to.
    pub stage: Stage,
    /// Speaker of the seeding message.
    pub role: String,
    /// The seeding message (the stage prompt for a standard tree).
    pub message: String,
    /// The user's captured response, once given.
    pub response: Option<String>,
    /// Child nodes. A single child in the default chain shape.
    pub children: Vec<StageNode>,
}

impl StageNode {
    pub fn new(stage: Stage, role: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            role: role.into(),
            message: message.into(),
            response: None,
            children: Vec::new(),
        }
    }

    /// Attach a child node.
    pub fn add_child(&mut self, child: StageNode) {
        self.children.push(child);
    }
}

/// Immutable serializable view of a whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTreeSnapshot {
    pub root: StageNode,
    pub active_path: Vec<usize>,
    pub active_stage: Stage,
}

/// The conversation stage state machine.
///
/// Freshly constructed trees are unbuilt: every operation other than
/// [`build`](Self::build) fails with `TreeNotBuilt` until a non-empty
/// conversation has been supplied. Once built, the active pointer starts
/// at the root and only ever moves forward.
#[derive(Debug, Clone, Default)]
pub struct ConversationStageTree {
    root: Option<StageNode>,
    active_path: Vec<usize>,
}

impl ConversationStageTree {
    /// Create an unbuilt tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical seven-stage chain, one node per stage, seeded with
    /// each stage's prompt.
    pub fn standard() -> Self {
        let turns: Vec<ConversationTurn> = Stage::SEQUENCE
            .iter()
            .map(|stage| ConversationTurn::new("assistant", stage.prompt()))
            .collect();
        let mut tree = Self::new();
        tree.build(&turns);
        tree
    }

    /// Build the tree from an ordered conversation, one node per turn,
    /// chained in input order. Stages are assigned in sequence order;
    /// turns beyond the seventh stay at the terminal stage.
    ///
    /// An empty conversation leaves the tree unbuilt.
    pub fn build(&mut self, conversation: &[ConversationTurn]) {
        self.root = None;
        self.active_path.clear();

        let mut chain: Option<StageNode> = None;
        for (index, turn) in conversation.iter().enumerate().rev() {
            let stage = Stage::SEQUENCE
                .get(index)
                .copied()
                .unwrap_or(Stage::HarvestOfWisdom);
            let mut node = StageNode::new(stage, &turn.role, &turn.message);
            if let Some(child) = chain.take() {
                node.children.push(child);
            }
            chain = Some(node);
        }
        self.root = chain;
    }

    /// Whether `build` has produced a root.
    pub fn is_built(&self) -> bool {
        self.root.is_some()
    }

    /// The node the active pointer references.
    pub fn active(&self) -> Result<&StageNode, OrchestrationError> {
        let mut node = self.root.as_ref().ok_or(OrchestrationError::TreeNotBuilt)?;
        for &index in &self.active_path {
            node = node
                .children
                .get(index)
                .ok_or(OrchestrationError::TreeNotBuilt)?;
        }
        Ok(node)
    }

    fn active_mut(&mut self) -> Result<&mut StageNode, OrchestrationError> {
        let mut node = self.root.as_mut().ok_or(OrchestrationError::TreeNotBuilt)?;
        for &index in &self.active_path {
            node = node
                .children
                .get_mut(index)
                .ok_or(OrchestrationError::TreeNotBuilt)?;
        }
        Ok(node)
    }

    /// Stage of the active node.
    pub fn active_stage(&self) -> Result<Stage, OrchestrationError> {
        Ok(self.active()?.stage)
    }

    /// Store the user's response on the active node. Mutates nothing else.
    pub fn capture_response(&mut self, text: &str) -> Result<(), OrchestrationError> {
        self.active_mut()?.response = Some(text.to_string());
        Ok(())
    }

    /// Move the active pointer to the first child of the active node.
    ///
    /// At a leaf (the terminal stage in a chain) the pointer stays put and
    /// the same node is returned; repeated calls are no-ops, not errors.
    pub fn advance(&mut self) -> Result<&StageNode, OrchestrationError> {
        if !self.active()?.children.is_empty() {
            self.active_path.push(0);
        }
        self.active()
    }

    /// Produce an immutable snapshot of the whole tree. Pure read.
    pub fn to_snapshot(&self) -> Result<StageTreeSnapshot, OrchestrationError> {
        let active_stage = self.active()?.stage;
        let root = self
            .root
            .clone()
            .ok_or(OrchestrationError::TreeNotBuilt)?;
        Ok(StageTreeSnapshot {
            root,
            active_path: self.active_path.clone(),
            active_stage,
        })
    }
}
