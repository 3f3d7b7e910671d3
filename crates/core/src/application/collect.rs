// Collection stage
// Scrape-only collector invocations; no model involvement

use crate::application::settings::PipelineSettings;
use crate::domain::{Language, LinkSet, PersonaMode, PersonaRequest};
use crate::port::{CommandRunResult, CommandSpec, ProcessRunner};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("{program} {reason}")]
    Command {
        program: String,
        reason: String,
        diagnostics: Option<String>,
    },

    #[error("{program} produced no output")]
    Empty {
        program: String,
        diagnostics: Option<String>,
    },
}

impl CollectionError {
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            CollectionError::Command { diagnostics, .. }
            | CollectionError::Empty { diagnostics, .. } => diagnostics.clone(),
        }
    }
}

/// Collected text plus whether the collector's output was cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub text: String,
    pub truncated: bool,
}

/// `<profile> --no-llm --link <url> --link <url> ...`
pub fn profile_collector_spec(settings: &PipelineSettings, links: &LinkSet) -> CommandSpec {
    let mut args = vec!["--no-llm".to_string()];
    for url in links.iter() {
        args.push("--link".to_string());
        args.push(url.as_str().to_string());
    }
    CommandSpec::new(
        settings.programs.profile_collector.clone(),
        args,
        settings.collect_timeout,
    )
}

/// `<persona> --dump-spec --language <lang> [--name N] (--prompt | --template | --reference) <value>`
pub fn persona_collector_spec(
    settings: &PipelineSettings,
    request: &PersonaRequest,
    language: Language,
) -> CommandSpec {
    let mut args = vec![
        "--dump-spec".to_string(),
        "--language".to_string(),
        language.as_str().to_string(),
    ];
    if let Some(name) = &request.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    let flag = match request.mode {
        PersonaMode::Prompt(_) => "--prompt",
        PersonaMode::Template(_) => "--template",
        PersonaMode::Reference(_) => "--reference",
    };
    args.push(flag.to_string());
    args.push(request.mode.value().to_string());

    CommandSpec::new(
        settings.programs.persona_collector.clone(),
        args,
        settings.collect_timeout,
    )
}

/// Run a collector. Anything but a successful run with non-blank stdout is an error.
pub async fn collect(
    runner: &dyn ProcessRunner,
    spec: &CommandSpec,
) -> Result<Collected, CollectionError> {
    debug!(command = %spec.display(), "Running collector");
    let result: CommandRunResult = runner.run(spec).await;

    if !result.is_success() {
        warn!(
            program = %spec.program,
            status = %result.describe_failure(),
            duration_ms = result.duration_ms,
            "Collector failed"
        );
        return Err(CollectionError::Command {
            program: spec.program.clone(),
            reason: result.describe_failure(),
            diagnostics: result.diagnostics(),
        });
    }

    if result.stdout.trim().is_empty() {
        warn!(program = %spec.program, "Collector produced no output");
        return Err(CollectionError::Empty {
            program: spec.program.clone(),
            diagnostics: result.diagnostics(),
        });
    }

    Ok(Collected {
        text: result.stdout.trim().to_string(),
        truncated: result.stdout_truncated,
    })
}
