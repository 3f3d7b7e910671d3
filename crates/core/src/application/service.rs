// Command Service
// Chat surface: parse -> queue / pipeline -> rendered reply

use crate::application::command::{
    parse_persona_command, parse_profile_command, CommonFlags, Parsed, PersonaCommand,
    ProfileCommand, RunFlags,
};
use crate::application::format::{Reply, ResponseFormatter, Surface};
use crate::application::orchestrator::Orchestrator;
use crate::domain::{
    LinkSet, NormalizedUrl, PersonaRequest, PipelineOutcome, ProfileRequest,
    RequesterKey, SynthesisOptions,
};
use crate::error::Result;
use crate::port::QueueStore;
use std::sync::Arc;
use tracing::{error, info};

pub struct CommandService {
    queue: Arc<dyn QueueStore>,
    orchestrator: Arc<Orchestrator>,
    formatter: ResponseFormatter,
}

impl CommandService {
    pub fn new(queue: Arc<dyn QueueStore>, orchestrator: Arc<Orchestrator>) -> Self {
        let settings = orchestrator.settings();
        let formatter = ResponseFormatter::new(settings.log_tail_lines, settings.log_tail_chars);
        Self {
            queue,
            orchestrator,
            formatter,
        }
    }

    pub fn render(&self, reply: &Reply) -> String {
        self.formatter.render(reply)
    }

    /// Handle profile command text and render the reply.
    ///
    /// `Err` is reserved for faults outside the pipeline taxonomy (queue storage).
    pub async fn handle_profile(&self, key: &RequesterKey, text: &str) -> Result<String> {
        let reply = self.profile_reply(key, text).await?;
        Ok(self.formatter.render(&reply))
    }

    pub async fn handle_persona(&self, key: &RequesterKey, text: &str) -> Result<String> {
        let reply = self.persona_reply(key, text).await;
        Ok(self.formatter.render(&reply))
    }

    pub async fn profile_reply(&self, key: &RequesterKey, text: &str) -> Result<Reply> {
        let command = match parse_profile_command(text) {
            Parsed::Command(command) => command,
            Parsed::Invalid { unknown } => {
                info!(requester = %key, ?unknown, "Unrecognized profile command");
                return Ok(Reply::Unrecognized {
                    surface: Surface::Profile,
                    unknown,
                });
            }
        };

        match command {
            ProfileCommand::Help => Ok(Reply::Help(Surface::Profile)),
            ProfileCommand::Add(urls) => {
                if urls.is_empty() {
                    return Ok(Reply::InputError {
                        surface: Surface::Profile,
                        message: "No links given.".to_string(),
                    });
                }
                let outcome = self.queue.add(key, &urls).await?;
                info!(requester = %key, added = outcome.added, total = outcome.total, "Queued links");
                Ok(Reply::Queued(outcome))
            }
            ProfileCommand::List => Ok(Reply::Listing(self.queue.list(key).await?)),
            ProfileCommand::Clear => {
                self.queue.clear(key).await?;
                info!(requester = %key, "Cleared queue");
                Ok(Reply::Cleared)
            }
            ProfileCommand::Run { urls, flags } => self.run_profile(key, urls, flags).await,
        }
    }

    async fn run_profile(
        &self,
        key: &RequesterKey,
        inline: Vec<NormalizedUrl>,
        flags: RunFlags,
    ) -> Result<Reply> {
        // Collection-only runs never consume the queue
        let retain = flags.keep_queue || flags.common.no_llm;
        let queued = self.queue.take(key, retain).await?;

        let mut links = queued.clone();
        links.extend(inline);

        let options = self.options(&flags.common);
        let mut request = match ProfileRequest::new(links, options) {
            Ok(request) => request,
            Err(e) => {
                return Ok(Reply::InputError {
                    surface: Surface::Profile,
                    message: e.to_string(),
                })
            }
        };
        request.output = flags.common.output.clone();

        let outcome = self.orchestrator.run_profile(&request).await;

        let mut notes = Vec::new();
        if !queued.is_empty() {
            if retain {
                notes.push(format!("Queue kept: {} queued.", queued.len()));
            } else if outcome.is_success() {
                notes.push("Queue cleared.".to_string());
            } else {
                notes.push(self.restore_queue(key, &queued).await);
            }
        }

        Ok(Reply::Outcome { outcome, notes })
    }

    /// Put back links taken for a run that failed.
    async fn restore_queue(&self, key: &RequesterKey, queued: &LinkSet) -> String {
        let urls: Vec<NormalizedUrl> = queued.iter().cloned().collect();
        match self.queue.add(key, &urls).await {
            Ok(outcome) => {
                info!(requester = %key, restored = outcome.added, "Restored queue after failed run");
                format!("Queue restored: {} queued.", outcome.total)
            }
            Err(e) => {
                error!(requester = %key, error = %e, "Could not restore queue");
                format!(
                    "Could not restore the queue ({}); queued links were: {}",
                    e,
                    queued.to_strings().join(" ")
                )
            }
        }
    }

    pub async fn persona_reply(&self, key: &RequesterKey, text: &str) -> Reply {
        let (mode, flags) = match parse_persona_command(text) {
            Parsed::Command(PersonaCommand::Generate { mode, flags }) => (mode, flags),
            Parsed::Command(PersonaCommand::Help) => return Reply::Help(Surface::Persona),
            Parsed::Invalid { unknown } => {
                info!(requester = %key, ?unknown, "Unrecognized persona command");
                return Reply::Unrecognized {
                    surface: Surface::Persona,
                    unknown,
                };
            }
        };

        let mut request = match PersonaRequest::new(mode, self.options(&flags.common)) {
            Ok(request) => request,
            Err(e) => {
                return Reply::InputError {
                    surface: Surface::Persona,
                    message: e.to_string(),
                }
            }
        };
        request.name = flags.name;
        request.output = flags.common.output;

        info!(requester = %key, input = request.mode.label(), "Persona request");
        let outcome: PipelineOutcome = self.orchestrator.run_persona(&request).await;
        Reply::Outcome {
            outcome,
            notes: Vec::new(),
        }
    }

    /// Request options with configured defaults filled in.
    fn options(&self, flags: &CommonFlags) -> SynthesisOptions {
        let settings = self.orchestrator.settings();
        SynthesisOptions {
            language: flags.language.unwrap_or(settings.default_language),
            mode: flags.mode.unwrap_or(settings.default_mode),
            agent: flags.agent.clone(),
            llm: flags.llm.clone(),
            skip_synthesis: flags.no_llm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::settings::PipelineSettings;
    use crate::domain::{FailureStage, Language};
    use crate::port::completion::mocks::ScriptedCompletionClient;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::installer::mocks::RenamingInstaller;
    use crate::port::process_runner::mocks::ScriptedProcessRunner;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::CommandRunResult;
    use tempfile::TempDir;

    struct Fixture {
        service: CommandService,
        runner: Arc<ScriptedProcessRunner>,
        queue: Arc<InMemoryQueueStore>,
        _dir: TempDir,
    }

    fn fixture(runner: ScriptedProcessRunner) -> Fixture {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(runner);
        let queue = Arc::new(InMemoryQueueStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            runner.clone(),
            Arc::new(ScriptedCompletionClient::replying("# Fallback")),
            Arc::new(RenamingInstaller::new()),
            Arc::new(SequentialIdProvider::default()),
            PipelineSettings::new(dir.path()),
        ));
        Fixture {
            service: CommandService::new(queue.clone(), orchestrator),
            runner,
            queue,
            _dir: dir,
        }
    }

    fn key() -> RequesterKey {
        RequesterKey::new("telegram", "bot1", "alice")
    }

    #[tokio::test]
    async fn test_queue_trailing_slash_scenario() {
        let f = fixture(ScriptedProcessRunner::new());
        f.service
            .handle_profile(&key(), "add https://github.com/alice")
            .await
            .unwrap();
        f.service
            .handle_profile(&key(), "add https://github.com/alice/")
            .await
            .unwrap();

        let reply = f.service.profile_reply(&key(), "list").await.unwrap();
        let Reply::Listing(links) = reply else {
            panic!("expected listing");
        };
        assert_eq!(links.to_strings(), vec!["https://github.com/alice"]);
    }

    #[tokio::test]
    async fn test_unknown_flag_shows_help_and_touches_nothing() {
        let f = fixture(ScriptedProcessRunner::new());
        let text = f
            .service
            .handle_profile(&key(), "run --turbo")
            .await
            .unwrap();
        assert!(text.starts_with("Unrecognized input: --turbo"));
        assert!(text.contains("Usage: whoami"));
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_with_empty_queue_is_input_error() {
        let f = fixture(ScriptedProcessRunner::new());
        let reply = f.service.profile_reply(&key(), "run").await.unwrap();
        assert!(matches!(reply, Reply::InputError { .. }));
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_consumes_queue() {
        let f = fixture(
            ScriptedProcessRunner::new()
                .respond("whoami", CommandRunResult::succeeded("data"))
                .respond("openclaw", CommandRunResult::succeeded("# Alice")),
        );
        f.service
            .handle_profile(&key(), "add https://github.com/alice")
            .await
            .unwrap();

        let text = f.service.handle_profile(&key(), "run").await.unwrap();
        assert!(text.starts_with("✓ USER.md generated"), "{}", text);
        assert!(text.ends_with("Queue cleared."));
        assert!(f.queue.list(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_restores_queue() {
        let f = fixture(
            ScriptedProcessRunner::new().respond("whoami", CommandRunResult::failed(1, "403")),
        );
        f.service
            .handle_profile(&key(), "add https://github.com/alice https://bob.dev")
            .await
            .unwrap();

        let reply = f.service.profile_reply(&key(), "run").await.unwrap();
        let Reply::Outcome { outcome, notes } = reply else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.failure_stage(), Some(FailureStage::Collection));
        assert_eq!(notes, vec!["Queue restored: 2 queued."]);
        assert_eq!(f.queue.list(&key()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_llm_keeps_queue_and_passes_language() {
        let f = fixture(
            ScriptedProcessRunner::new().respond("whoami", CommandRunResult::succeeded("raw")),
        );
        f.service
            .handle_profile(&key(), "https://github.com/alice")
            .await
            .unwrap();

        let reply = f
            .service
            .profile_reply(&key(), "run --no-llm --lang en")
            .await
            .unwrap();
        let Reply::Outcome { outcome, notes } = reply else {
            panic!("expected outcome");
        };
        assert!(matches!(outcome, PipelineOutcome::CollectedOnly { .. }));
        assert_eq!(notes, vec!["Queue kept: 1 queued."]);
        assert_eq!(f.queue.list(&key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keep_queue_retains_links_after_success() {
        let f = fixture(
            ScriptedProcessRunner::new()
                .respond("whoami", CommandRunResult::succeeded("data"))
                .respond("openclaw", CommandRunResult::succeeded("# Alice")),
        );
        f.service
            .handle_profile(&key(), "add https://github.com/alice")
            .await
            .unwrap();

        let reply = f
            .service
            .profile_reply(&key(), "run --keep-queue")
            .await
            .unwrap();
        let Reply::Outcome { outcome, notes } = reply else {
            panic!("expected outcome");
        };
        assert!(outcome.is_success());
        assert_eq!(notes, vec!["Queue kept: 1 queued."]);
        assert_eq!(f.queue.list(&key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inline_links_run_without_queue() {
        let f = fixture(
            ScriptedProcessRunner::new()
                .respond("whoami", CommandRunResult::succeeded("data"))
                .respond("openclaw", CommandRunResult::succeeded("# Alice")),
        );
        let reply = f
            .service
            .profile_reply(&key(), "run https://alice.dev")
            .await
            .unwrap();
        let Reply::Outcome { outcome, notes } = reply else {
            panic!("expected outcome");
        };
        assert!(outcome.is_success());
        assert!(notes.is_empty());
        let collector = &f.runner.calls_to("whoami")[0];
        assert_eq!(collector.args, vec!["--no-llm", "--link", "https://alice.dev"]);
    }

    #[tokio::test]
    async fn test_persona_blank_description_is_input_error() {
        let f = fixture(ScriptedProcessRunner::new());
        let reply = f.service.persona_reply(&key(), "prompt   ").await;
        let Reply::InputError { message, .. } = reply else {
            panic!("expected input error");
        };
        assert!(message.contains("description"));
        assert!(f.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_persona_uses_default_language() {
        let f = fixture(
            ScriptedProcessRunner::new().respond("whoareu", CommandRunResult::succeeded("spec")),
        );
        let reply = f
            .service
            .persona_reply(&key(), "template casual --no-llm --lang nope")
            .await;
        assert!(matches!(
            reply,
            Reply::Outcome {
                outcome: PipelineOutcome::CollectedOnly { .. },
                ..
            }
        ));
        let call = &f.runner.calls_to("whoareu")[0];
        assert_eq!(call.args[2], Language::Zh.as_str());
    }
}
