// Response Formatter
// Pure rendering of replies; bounded log excerpts

use crate::application::command::help::{PERSONA_HELP, PROFILE_HELP};
use crate::application::settings::{DEFAULT_LOG_TAIL_CHARS, DEFAULT_LOG_TAIL_LINES};
use crate::application::validate::snippet;
use crate::domain::{
    ArtifactKind, AttemptRecord, InstalledArtifact, LinkSet, PipelineFailure, PipelineOutcome,
    PipelineSuccess, SuccessGrade,
};
use crate::port::AddOutcome;
use std::fmt::Write;

/// Characters of collected text shown when synthesis is skipped
const COLLECTED_PREVIEW_CHARS: usize = 4000;

/// Which command surface a reply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Profile,
    Persona,
}

impl Surface {
    pub fn help(&self) -> &'static str {
        match self {
            Surface::Profile => PROFILE_HELP,
            Surface::Persona => PERSONA_HELP,
        }
    }
}

/// Everything the command service can answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Help(Surface),
    /// Tokens the parser did not understand
    Unrecognized {
        surface: Surface,
        unknown: Vec<String>,
    },
    /// Request rejected before the pipeline started
    InputError { surface: Surface, message: String },
    Queued(AddOutcome),
    Listing(LinkSet),
    Cleared,
    Outcome {
        outcome: PipelineOutcome,
        notes: Vec<String>,
    },
}

impl Reply {
    /// The request was rejected or its pipeline failed.
    pub fn is_failure(&self) -> bool {
        match self {
            Reply::InputError { .. } => true,
            Reply::Outcome { outcome, .. } => matches!(outcome, PipelineOutcome::Failed(_)),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFormatter {
    tail_lines: usize,
    tail_chars: usize,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_TAIL_LINES, DEFAULT_LOG_TAIL_CHARS)
    }
}

impl ResponseFormatter {
    pub fn new(tail_lines: usize, tail_chars: usize) -> Self {
        Self {
            tail_lines: tail_lines.max(1),
            tail_chars: tail_chars.max(1),
        }
    }

    pub fn render(&self, reply: &Reply) -> String {
        match reply {
            Reply::Help(surface) => surface.help().to_string(),
            Reply::Unrecognized { surface, unknown } => format!(
                "Unrecognized input: {}\n\n{}",
                unknown.join(" "),
                surface.help()
            ),
            Reply::InputError { surface, message } => {
                format!("✗ {}\n\n{}", message, surface.help())
            }
            Reply::Queued(outcome) => render_queued(outcome),
            Reply::Listing(links) => render_listing(links),
            Reply::Cleared => "Queue cleared.".to_string(),
            Reply::Outcome { outcome, notes } => {
                let mut text = self.render_outcome(outcome);
                for note in notes {
                    let _ = write!(text, "\n{}", note);
                }
                text
            }
        }
    }

    pub fn render_outcome(&self, outcome: &PipelineOutcome) -> String {
        match outcome {
            PipelineOutcome::Installed(success) => self.render_success(success),
            PipelineOutcome::CollectedOnly { kind, text } => {
                let what = match kind {
                    ArtifactKind::Profile => "Collected profile data",
                    ArtifactKind::Persona => "Collected persona spec",
                };
                format!(
                    "{} (synthesis skipped, nothing written):\n\n{}",
                    what,
                    snippet(text, COLLECTED_PREVIEW_CHARS)
                )
            }
            PipelineOutcome::Failed(failure) => self.render_failure(failure),
        }
    }

    fn render_success(&self, success: &PipelineSuccess) -> String {
        let mut out = match success.grade {
            SuccessGrade::Full => format!(
                "✓ {} generated ({})",
                documents_label(success.kind),
                success.strategy
            ),
            SuccessGrade::Partial => format!(
                "⚠ {} generated via fallback ({}); partial success",
                documents_label(success.kind),
                success.strategy
            ),
        };

        if success.grade == SuccessGrade::Partial {
            for attempt in success.attempts.iter().filter(|a| !a.succeeded) {
                let _ = write!(out, "\n  {} failed: {}", attempt.strategy, attempt_error(attempt));
            }
        }

        for artifact in &success.artifacts {
            render_installed(&mut out, artifact);
        }
        for warning in &success.warnings {
            let _ = write!(out, "\n  note: {}", warning);
        }
        out
    }

    fn render_failure(&self, failure: &PipelineFailure) -> String {
        let mut out = format!(
            "✗ {}: {} failed",
            documents_label(failure.kind),
            failure.stage
        );
        for cause in &failure.causes {
            let _ = write!(out, "\n  cause: {}", cause);
        }

        // Causes already name each attempt; only their captured output is added here
        for attempt in &failure.attempts {
            if let Some(diag) = &attempt.diagnostics {
                let _ = write!(out, "\n  {} output:", attempt.strategy);
                self.render_excerpt(&mut out, diag);
            }
        }

        if let Some(diag) = &failure.diagnostics {
            self.render_excerpt(&mut out, diag);
        }

        if !failure.installed.is_empty() {
            out.push_str("\n  installed before the failure:");
            for artifact in &failure.installed {
                render_installed(&mut out, artifact);
            }
        }
        out
    }

    fn render_excerpt(&self, out: &mut String, text: &str) {
        let excerpt = self.tail(text);
        if excerpt.is_empty() {
            return;
        }
        out.push_str("\n  ---");
        for line in excerpt.lines() {
            let _ = write!(out, "\n  | {}", line);
        }
    }

    /// Last `tail_lines` lines, further capped to the last `tail_chars` characters.
    pub fn tail(&self, text: &str) -> String {
        let trimmed = text.trim_end();
        let lines: Vec<&str> = trimmed.lines().collect();
        let skip = lines.len().saturating_sub(self.tail_lines);
        let mut tail = lines[skip..].join("\n");
        let mut cut = skip > 0;

        let chars = tail.chars().count();
        if chars > self.tail_chars {
            tail = tail.chars().skip(chars - self.tail_chars).collect();
            cut = true;
        }

        if cut {
            format!("…\n{}", tail)
        } else {
            tail
        }
    }
}

fn documents_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Profile => "USER.md",
        ArtifactKind::Persona => "IDENTITY.md + SOUL.md",
    }
}

fn attempt_error(attempt: &AttemptRecord) -> String {
    attempt
        .error
        .clone()
        .unwrap_or_else(|| "failed".to_string())
}

fn render_installed(out: &mut String, artifact: &InstalledArtifact) {
    let _ = write!(out, "\n  → {}", artifact.final_path.display());
    match &artifact.backup_path {
        Some(backup) => {
            let _ = write!(out, "\n    previous version backed up to {}", backup.display());
        }
        None => out.push_str("\n    no previous file, no backup created"),
    }
}

fn render_queued(outcome: &AddOutcome) -> String {
    let noun = |n: usize| if n == 1 { "link" } else { "links" };
    if outcome.added == 0 {
        format!(
            "Already queued. {} {} waiting; send `run` to generate USER.md.",
            outcome.total,
            noun(outcome.total)
        )
    } else {
        format!(
            "Added {} {}. {} {} queued; send `run` to generate USER.md.",
            outcome.added,
            noun(outcome.added),
            outcome.total,
            noun(outcome.total)
        )
    }
}

fn render_listing(links: &LinkSet) -> String {
    if links.is_empty() {
        return "Queue is empty. Add links with `add <link>`.".to_string();
    }
    let mut out = format!("Queued links ({}):", links.len());
    for (i, url) in links.iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, url);
    }
    out
}
