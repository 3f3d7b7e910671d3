// Pipeline Outcome Model
// Terminal results of the synthesis pipeline (success / partial / failure)

use crate::domain::artifact::{ArtifactKind, InstalledArtifact};
use serde::{Deserialize, Serialize};

/// Stage at which a pipeline stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Input,
    Collection,
    Synthesis,
    Validation,
    Install,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureStage::Input => "input",
            FailureStage::Collection => "collection",
            FailureStage::Synthesis => "synthesis",
            FailureStage::Validation => "validation",
            FailureStage::Install => "install",
        };
        f.write_str(s)
    }
}

/// Synthesis strategies, in the order they are normally tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AgentDelegated,
    DirectCall,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::AgentDelegated => write!(f, "agent"),
            StrategyKind::DirectCall => write!(f, "direct"),
        }
    }
}

/// One synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub strategy: StrategyKind,
    pub succeeded: bool,
    pub error: Option<String>,
    /// Captured stderr / response body, already bounded
    pub diagnostics: Option<String>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessGrade {
    /// First strategy of the chain produced the output
    Full,
    /// A fallback strategy produced the output after earlier attempts failed
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSuccess {
    pub kind: ArtifactKind,
    pub artifacts: Vec<InstalledArtifact>,
    pub strategy: StrategyKind,
    pub grade: SuccessGrade,
    pub attempts: Vec<AttemptRecord>,
    /// Non-fatal findings (missing recommended sections, truncated logs)
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub kind: ArtifactKind,
    pub stage: FailureStage,
    /// Outermost cause first
    pub causes: Vec<String>,
    pub diagnostics: Option<String>,
    pub attempts: Vec<AttemptRecord>,
    /// Documents that were installed before a later document failed
    pub installed: Vec<InstalledArtifact>,
}

impl PipelineFailure {
    pub fn new(kind: ArtifactKind, stage: FailureStage, cause: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            causes: vec![cause.into()],
            diagnostics: None,
            attempts: Vec::new(),
            installed: Vec::new(),
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Option<String>) -> Self {
        self.diagnostics = diagnostics.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Installed(PipelineSuccess),
    /// Synthesis was skipped on request; carries the collected text
    CollectedOnly { kind: ArtifactKind, text: String },
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, PipelineOutcome::Failed(_))
    }

    pub fn failure_stage(&self) -> Option<FailureStage> {
        match self {
            PipelineOutcome::Failed(f) => Some(f.stage),
            _ => None,
        }
    }
}
