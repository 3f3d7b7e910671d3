// Agent-delegated synthesis
// Hands the instructions and collected text to the host agent CLI

use super::prompt::agent_message;
use super::{SynthesisError, SynthesisJob, SynthesisStrategy};
use crate::domain::StrategyKind;
use crate::port::{CommandSpec, ProcessRunner, RunStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct AgentDelegatedStrategy {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    /// Argument template; see `ProgramSettings::agent_args`
    args: Vec<String>,
    timeout: Duration,
}

impl AgentDelegatedStrategy {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Substitute placeholders. `{message}` goes last so its content is never re-expanded.
    fn command_for(&self, job: &SynthesisJob) -> CommandSpec {
        let message = agent_message(job.kind, job.language, job.name.as_deref(), &job.collected);
        let timeout_secs = self.timeout.as_secs().to_string();

        let args = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{agent}", &job.agent)
                    .replace("{timeout_secs}", &timeout_secs)
                    .replace("{language}", job.language.as_str())
                    .replace("{message}", &message)
            })
            .collect();

        CommandSpec::new(self.program.clone(), args, self.timeout)
    }
}

#[async_trait]
impl SynthesisStrategy for AgentDelegatedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AgentDelegated
    }

    async fn synthesize(&self, job: &SynthesisJob) -> Result<String, SynthesisError> {
        let spec = self.command_for(job);
        info!(
            program = %self.program,
            agent = %job.agent,
            timeout_secs = self.timeout.as_secs(),
            "Delegating synthesis to host agent"
        );

        let result = self.runner.run(&spec).await;
        match result.status {
            RunStatus::Succeeded => {}
            RunStatus::TimedOut { after_ms } => {
                warn!(program = %self.program, after_ms, "Host agent timed out");
                return Err(SynthesisError::Timeout {
                    secs: after_ms.div_ceil(1000),
                    diagnostics: result.diagnostics(),
                });
            }
            _ => {
                return Err(SynthesisError::Command {
                    program: self.program.clone(),
                    reason: result.describe_failure(),
                    diagnostics: result.diagnostics(),
                });
            }
        }

        if result.stdout.trim().is_empty() {
            return Err(SynthesisError::EmptyOutput);
        }
        Ok(result.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::settings::default_agent_args;
    use crate::domain::{ArtifactKind, Language, LlmOverrides};
    use crate::port::process_runner::mocks::ScriptedProcessRunner;
    use crate::port::CommandRunResult;

    fn job() -> SynthesisJob {
        SynthesisJob {
            kind: ArtifactKind::Profile,
            language: Language::En,
            collected: "scraped {agent} text".to_string(),
            agent: "main".to_string(),
            llm: LlmOverrides::default(),
            name: None,
        }
    }

    fn strategy(runner: Arc<ScriptedProcessRunner>) -> AgentDelegatedStrategy {
        AgentDelegatedStrategy::new(
            runner,
            "openclaw",
            default_agent_args(),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_argv_substitution() {
        let runner = Arc::new(
            ScriptedProcessRunner::new().respond("openclaw", CommandRunResult::succeeded("# USER")),
        );
        let out = strategy(runner.clone()).synthesize(&job()).await.unwrap();
        assert_eq!(out, "# USER");

        let call = &runner.calls_to("openclaw")[0];
        assert_eq!(call.args[0], "agent");
        assert_eq!(call.args[1..3], ["--agent".to_string(), "main".to_string()]);
        assert_eq!(call.args[5..7], ["--timeout".to_string(), "300".to_string()]);
        // collected text keeps its literal braces
        assert!(call.args[4].ends_with("scraped {agent} text"));
        assert_eq!(call.timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let runner = Arc::new(
            ScriptedProcessRunner::new()
                .respond("openclaw", CommandRunResult::timed_out(300_000, "")),
        );
        let err = strategy(runner).synthesize(&job()).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Timeout { secs: 300, .. }));
        assert_eq!(err.to_string(), "timed out after 300s");
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let runner = Arc::new(ScriptedProcessRunner::new().respond(
            "openclaw",
            CommandRunResult::timed_out(300_000, "agent stuck at step 3"),
        ));
        let err = strategy(runner).synthesize(&job()).await.unwrap_err();
        assert_eq!(err.diagnostics().as_deref(), Some("agent stuck at step 3"));
    }

    #[tokio::test]
    async fn test_missing_binary_and_empty_output() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let err = strategy(runner).synthesize(&job()).await.unwrap_err();
        assert!(err.to_string().contains("could not start"));

        let runner = Arc::new(
            ScriptedProcessRunner::new().respond("openclaw", CommandRunResult::succeeded(" \n")),
        );
        let err = strategy(runner).synthesize(&job()).await.unwrap_err();
        assert_eq!(err, SynthesisError::EmptyOutput);
    }
}
