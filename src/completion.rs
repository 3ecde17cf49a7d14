//! Text-completion seam.
//!
//! The orchestration core never talks to a language-model API directly.
//! Sub-agents consult an implementation of [`CompletionProvider`] supplied
//! by the embedding application; the call is fallible and may be slow, so
//! the manager bounds it with a timeout.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a completion backend can report.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// The backend rejected or failed the request.
    #[error("completion backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time.
    #[error("completion request timed out")]
    Timeout,
}

/// An external capability that answers a prompt with text.
///
/// Implementations wrap whatever model or service the deployment uses.
/// Calls may suspend for a long time; callers are expected to bound them
/// with their own deadline.
#[async_trait]
pub trait CompletionProvider: Send + Sync + fmt::Debug {
    /// Answer `prompt` with completed text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Deterministic provider for tests and offline demos.
///
/// Returns the configured reply when one is set, otherwise echoes the
/// prompt back so callers can assert on exactly what the agent asked.
#[derive(Debug, Clone, Default)]
pub struct CannedCompletion {
    reply: Option<String>,
}

impl CannedCompletion {
    /// Create an echoing provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that always answers with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }
}

#[async_trait]
impl CompletionProvider for CannedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Ok(format!("[canned] {prompt}")),
        }
    }
}
