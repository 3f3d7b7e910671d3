// Completion Client Port
// Direct model-completion path (bypasses the host agent)

use crate::domain::LlmOverrides;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub overrides: LlmOverrides,
    pub timeout: Duration,
}

/// Completion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Unknown provider '{name}' (available: {available})")]
    UnknownProvider { name: String, available: String },

    #[error("No API key configured for {0}")]
    MissingCredentials(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Model returned no content")]
    Empty,
}

/// Completion Client trait
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system + user exchange and return the assistant text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Model identifier that `complete` would use, for logs and replies.
    fn describe(&self, overrides: &LlmOverrides) -> String;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted replies in order; the last one repeats.
    pub struct ScriptedCompletionClient {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedCompletionClient {
        pub fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub fn replying(text: impl Into<String>) -> Self {
            Self::new(vec![Ok(text.into())])
        }

        pub fn failing(error: CompletionError) -> Self {
            Self::new(vec![Err(error)])
        }

        /// Sleep before answering (for timeout tests).
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletionClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut replies = self.replies.lock().unwrap();
            match replies.len() {
                0 => Err(CompletionError::Transport("no scripted reply".to_string())),
                1 => replies[0].clone(),
                _ => replies.pop_front().unwrap(),
            }
        }

        fn describe(&self, overrides: &LlmOverrides) -> String {
            overrides
                .model
                .clone()
                .unwrap_or_else(|| "mock-model".to_string())
        }
    }
}
