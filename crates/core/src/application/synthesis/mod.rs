// Synthesis strategies
// Ordered alternatives for turning collected text into a document

mod agent;
mod direct;
pub mod prompt;

pub use agent::AgentDelegatedStrategy;
pub use direct::DirectCallStrategy;

use crate::domain::{ArtifactKind, Language, LlmOverrides, StrategyKind};
use crate::port::CompletionError;
use async_trait::async_trait;
use thiserror::Error;

/// Everything a strategy needs for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisJob {
    pub kind: ArtifactKind,
    pub language: Language,
    /// Collector output (scraped profile text or persona spec)
    pub collected: String,
    /// Host agent id for agent-delegated synthesis
    pub agent: String,
    pub llm: LlmOverrides,
    /// Persona name, when given
    pub name: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("{program} {reason}")]
    Command {
        program: String,
        reason: String,
        diagnostics: Option<String>,
    },

    #[error("timed out after {secs}s")]
    Timeout {
        secs: u64,
        /// Output captured before the deadline
        diagnostics: Option<String>,
    },

    #[error("{0}")]
    Completion(#[from] CompletionError),

    #[error("empty output")]
    EmptyOutput,
}

impl SynthesisError {
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            SynthesisError::Command { diagnostics, .. }
            | SynthesisError::Timeout { diagnostics, .. } => diagnostics.clone(),
            SynthesisError::Completion(CompletionError::Http { body, .. }) => Some(body.clone()),
            _ => None,
        }
    }
}

/// One way of producing a document.
#[async_trait]
pub trait SynthesisStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Produce raw document text. Must respect its own timeout.
    async fn synthesize(&self, job: &SynthesisJob) -> Result<String, SynthesisError>;
}
