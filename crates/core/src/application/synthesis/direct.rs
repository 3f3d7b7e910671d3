// Direct-call synthesis
// One chat completion, bypassing the host agent

use super::prompt::instructions;
use super::{SynthesisError, SynthesisJob, SynthesisStrategy};
use crate::domain::StrategyKind;
use crate::port::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct DirectCallStrategy {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl DirectCallStrategy {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl SynthesisStrategy for DirectCallStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectCall
    }

    async fn synthesize(&self, job: &SynthesisJob) -> Result<String, SynthesisError> {
        let request = CompletionRequest {
            system: instructions(job.kind, job.language, job.name.as_deref()),
            user: job.collected.clone(),
            overrides: job.llm.clone(),
            timeout: self.timeout,
        };
        info!(
            model = %self.client.describe(&job.llm),
            timeout_secs = self.timeout.as_secs(),
            "Calling model directly"
        );

        // The client enforces the timeout too; this bounds clients that don't
        let limit_secs = (self.timeout.as_millis() as u64).div_ceil(1000);
        let text = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| SynthesisError::Timeout {
                secs: limit_secs,
                diagnostics: None,
            })??;

        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyOutput);
        }
        Ok(text)
    }
}
