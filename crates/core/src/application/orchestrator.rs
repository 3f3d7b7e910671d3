// Synthesis Orchestrator
// Collecting -> Synthesizing (ordered strategies) -> Validated -> Installed | Failed

use crate::application::collect::{collect, persona_collector_spec, profile_collector_spec};
use crate::application::settings::PipelineSettings;
use crate::application::synthesis::{
    AgentDelegatedStrategy, DirectCallStrategy, SynthesisJob, SynthesisStrategy,
};
use crate::application::validate::{validate_persona, validate_profile, ValidatedOutput};
use crate::domain::{
    ArtifactKind, AttemptRecord, DocumentKind, FailureStage, GeneratedDocument, InstalledArtifact,
    PersonaRequest, PipelineFailure, PipelineOutcome, PipelineSuccess, ProfileRequest,
    StagedArtifact, StrategyKind, SuccessGrade, SynthesisMode, SynthesisOptions,
};
use crate::port::{ArtifactInstaller, CommandSpec, CompletionClient, IdProvider, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Output of a successful strategy plus every attempt made.
struct Synthesized {
    text: String,
    strategy: StrategyKind,
    grade: SuccessGrade,
    attempts: Vec<AttemptRecord>,
}

/// Runs the two fixed pipelines. One call handles one request; stages are sequential.
pub struct Orchestrator {
    runner: Arc<dyn ProcessRunner>,
    installer: Arc<dyn ArtifactInstaller>,
    ids: Arc<dyn IdProvider>,
    agent: Arc<dyn SynthesisStrategy>,
    direct: Arc<dyn SynthesisStrategy>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        completion: Arc<dyn CompletionClient>,
        installer: Arc<dyn ArtifactInstaller>,
        ids: Arc<dyn IdProvider>,
        settings: PipelineSettings,
    ) -> Self {
        let agent: Arc<dyn SynthesisStrategy> = Arc::new(AgentDelegatedStrategy::new(
            runner.clone(),
            settings.programs.agent.clone(),
            settings.programs.agent_args.clone(),
            settings.agent_timeout,
        ));
        let direct: Arc<dyn SynthesisStrategy> =
            Arc::new(DirectCallStrategy::new(completion, settings.direct_timeout));
        Self {
            runner,
            installer,
            ids,
            agent,
            direct,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Strategies to try, in order, for a mode.
    pub fn strategy_chain(&self, mode: SynthesisMode) -> Vec<Arc<dyn SynthesisStrategy>> {
        match mode {
            SynthesisMode::Agent if self.settings.fallback_enabled => {
                vec![self.agent.clone(), self.direct.clone()]
            }
            SynthesisMode::Agent => vec![self.agent.clone()],
            SynthesisMode::Direct => vec![self.direct.clone()],
        }
    }

    /// Links -> USER.md
    pub async fn run_profile(&self, request: &ProfileRequest) -> PipelineOutcome {
        let kind = ArtifactKind::Profile;
        if request.links.is_empty() {
            return PipelineOutcome::Failed(PipelineFailure::new(
                kind,
                FailureStage::Input,
                "no links to process",
            ));
        }
        info!(
            links = request.links.len(),
            mode = %request.options.mode,
            language = %request.options.language,
            "Starting profile pipeline"
        );

        let targets = vec![(
            DocumentKind::User,
            profile_target(&self.settings.workspace_dir, request.output.as_deref()).await,
        )];
        let spec = profile_collector_spec(&self.settings, &request.links);
        self.execute(kind, spec, &request.options, None, targets)
            .await
    }

    /// Persona description -> IDENTITY.md + SOUL.md
    pub async fn run_persona(&self, request: &PersonaRequest) -> PipelineOutcome {
        let kind = ArtifactKind::Persona;
        if request.mode.value().trim().is_empty() {
            return PipelineOutcome::Failed(PipelineFailure::new(
                kind,
                FailureStage::Input,
                "empty persona description",
            ));
        }
        info!(
            input = request.mode.label(),
            mode = %request.options.mode,
            language = %request.options.language,
            "Starting persona pipeline"
        );

        let dir = request
            .output
            .clone()
            .unwrap_or_else(|| self.settings.workspace_dir.clone());
        let targets = kind
            .documents()
            .iter()
            .map(|doc| (*doc, dir.join(doc.file_name())))
            .collect();
        let spec = persona_collector_spec(&self.settings, request, request.options.language);
        self.execute(
            kind,
            spec,
            &request.options,
            request.name.clone(),
            targets,
        )
        .await
    }

    async fn execute(
        &self,
        kind: ArtifactKind,
        collect_spec: CommandSpec,
        options: &SynthesisOptions,
        name: Option<String>,
        targets: Vec<(DocumentKind, PathBuf)>,
    ) -> PipelineOutcome {
        // Collecting
        let collected = match collect(self.runner.as_ref(), &collect_spec).await {
            Ok(collected) => collected,
            Err(e) => {
                return PipelineOutcome::Failed(
                    PipelineFailure::new(kind, FailureStage::Collection, e.to_string())
                        .with_diagnostics(e.diagnostics()),
                );
            }
        };
        let mut warnings = Vec::new();
        if collected.truncated {
            warnings.push("collector output was truncated".to_string());
        }

        if options.skip_synthesis {
            info!(kind = kind.label(), "Synthesis skipped; returning collected text");
            return PipelineOutcome::CollectedOnly {
                kind,
                text: collected.text,
            };
        }

        // Synthesizing
        let job = SynthesisJob {
            kind,
            language: options.language,
            collected: collected.text,
            agent: options
                .agent
                .clone()
                .unwrap_or_else(|| self.settings.default_agent.clone()),
            llm: options.llm.clone(),
            name,
        };
        let synthesized = match self.synthesize(&job, options.mode).await {
            Ok(s) => s,
            Err(attempts) => {
                let mut failure = PipelineFailure::new(
                    kind,
                    FailureStage::Synthesis,
                    if attempts.len() > 1 {
                        "all synthesis strategies failed"
                    } else {
                        "synthesis failed"
                    },
                );
                for attempt in &attempts {
                    failure = failure.with_cause(format!(
                        "{}: {}",
                        attempt.strategy,
                        attempt.error.as_deref().unwrap_or("failed")
                    ));
                }
                return PipelineOutcome::Failed(failure.with_attempts(attempts));
            }
        };

        // Validated
        let validated = match kind {
            ArtifactKind::Profile => validate_profile(&synthesized.text),
            ArtifactKind::Persona => validate_persona(&synthesized.text),
        };
        let ValidatedOutput {
            documents,
            warnings: schema_warnings,
        } = match validated {
            Ok(v) => v,
            Err(e) => {
                warn!(kind = kind.label(), reason = %e, "Synthesized output rejected");
                return PipelineOutcome::Failed(
                    PipelineFailure::new(kind, FailureStage::Validation, e.reason.clone())
                        .with_cause(format!("produced by {}", synthesized.strategy))
                        .with_diagnostics(Some(e.snippet))
                        .with_attempts(synthesized.attempts),
                );
            }
        };
        warnings.extend(schema_warnings);

        // Installed
        match self.install_documents(kind, documents, &targets).await {
            Ok(artifacts) => {
                info!(
                    kind = kind.label(),
                    strategy = %synthesized.strategy,
                    files = artifacts.len(),
                    "Pipeline finished"
                );
                PipelineOutcome::Installed(PipelineSuccess {
                    kind,
                    artifacts,
                    strategy: synthesized.strategy,
                    grade: synthesized.grade,
                    attempts: synthesized.attempts,
                    warnings,
                })
            }
            Err(failure) => PipelineOutcome::Failed(failure.with_attempts(synthesized.attempts)),
        }
    }

    /// Try each strategy in order, stopping at the first success.
    async fn synthesize(
        &self,
        job: &SynthesisJob,
        mode: SynthesisMode,
    ) -> Result<Synthesized, Vec<AttemptRecord>> {
        let chain = self.strategy_chain(mode);
        let mut attempts = Vec::with_capacity(chain.len());

        for (index, strategy) in chain.iter().enumerate() {
            let started = Instant::now();
            let result = strategy.synthesize(job).await;
            let duration_ms = started.elapsed().as_millis() as i64;

            match result {
                Ok(text) => {
                    attempts.push(AttemptRecord {
                        strategy: strategy.kind(),
                        succeeded: true,
                        error: None,
                        diagnostics: None,
                        duration_ms,
                    });
                    if index > 0 {
                        info!(strategy = %strategy.kind(), "Fallback strategy succeeded");
                    }
                    return Ok(Synthesized {
                        text,
                        strategy: strategy.kind(),
                        grade: if index == 0 {
                            SuccessGrade::Full
                        } else {
                            SuccessGrade::Partial
                        },
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(
                        strategy = %strategy.kind(),
                        error = %e,
                        duration_ms,
                        "Synthesis attempt failed"
                    );
                    attempts.push(AttemptRecord {
                        strategy: strategy.kind(),
                        succeeded: false,
                        error: Some(e.to_string()),
                        diagnostics: e.diagnostics(),
                        duration_ms,
                    });
                }
            }
        }

        Err(attempts)
    }

    /// Stage every document, then install them in order.
    ///
    /// On failure, staged files not yet installed are removed; documents already
    /// installed are listed in the failure.
    async fn install_documents(
        &self,
        kind: ArtifactKind,
        documents: Vec<GeneratedDocument>,
        targets: &[(DocumentKind, PathBuf)],
    ) -> Result<Vec<InstalledArtifact>, PipelineFailure> {
        let unique = self.ids.generate_id();
        let mut staged: Vec<StagedArtifact> = Vec::with_capacity(documents.len());

        for doc in documents {
            let Some((_, final_path)) = targets.iter().find(|(k, _)| *k == doc.kind) else {
                remove_staged(&staged).await;
                return Err(PipelineFailure::new(
                    kind,
                    FailureStage::Install,
                    format!("no target path for {}", doc.kind),
                ));
            };
            let artifact = StagedArtifact {
                kind: doc.kind,
                staged_path: StagedArtifact::path_for(final_path, &unique),
                final_path: final_path.clone(),
            };

            if let Err(e) = write_staged(&artifact, &doc.content).await {
                error!(path = %artifact.staged_path.display(), error = %e, "Staging failed");
                staged.push(artifact);
                remove_staged(&staged).await;
                return Err(PipelineFailure::new(
                    kind,
                    FailureStage::Install,
                    format!("could not stage {}", doc.kind),
                )
                .with_cause(e.to_string()));
            }
            debug!(path = %artifact.staged_path.display(), "Staged document");
            staged.push(artifact);
        }

        let mut installed = Vec::with_capacity(staged.len());
        for (index, artifact) in staged.iter().enumerate() {
            match self.installer.install(artifact).await {
                Ok(done) => {
                    info!(
                        path = %done.final_path.display(),
                        backup = ?done.backup_path,
                        "Installed document"
                    );
                    installed.push(done);
                }
                Err(e) => {
                    error!(
                        path = %artifact.final_path.display(),
                        error = %e,
                        "Install failed"
                    );
                    remove_staged(&staged[index..]).await;
                    let mut failure = PipelineFailure::new(
                        kind,
                        FailureStage::Install,
                        format!("installing {} failed", artifact.kind),
                    )
                    .with_cause(e.to_string());
                    failure.installed = installed;
                    return Err(failure);
                }
            }
        }

        Ok(installed)
    }
}

/// Explicit file, explicit directory, or the workspace default.
async fn profile_target(workspace: &Path, output: Option<&Path>) -> PathBuf {
    let file_name = DocumentKind::User.file_name();
    match output {
        None => workspace.join(file_name),
        Some(path) => {
            let looks_like_dir = path.as_os_str().to_string_lossy().ends_with('/');
            let is_dir = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if looks_like_dir || is_dir {
                path.join(file_name)
            } else {
                path.to_path_buf()
            }
        }
    }
}

async fn write_staged(artifact: &StagedArtifact, content: &str) -> std::io::Result<()> {
    if let Some(parent) = artifact.staged_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&artifact.staged_path, content).await
}

async fn remove_staged(staged: &[StagedArtifact]) {
    for artifact in staged {
        match tokio::fs::remove_file(&artifact.staged_path).await {
            Ok(()) => debug!(path = %artifact.staged_path.display(), "Removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %artifact.staged_path.display(),
                error = %e,
                "Could not remove staged file"
            ),
        }
    }
}
