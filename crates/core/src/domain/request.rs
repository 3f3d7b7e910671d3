// Request Domain Model
// Normalized inputs of the two synthesis pipelines

use crate::domain::error::{DomainError, Result};
use crate::domain::language::Language;
use crate::domain::link::LinkSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which synthesis strategy chain a request starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// Host agent first, direct call as fallback (when enabled)
    #[default]
    Agent,
    /// Direct model call only
    Direct,
}

impl SynthesisMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agent" => Some(SynthesisMode::Agent),
            "direct" | "llm" => Some(SynthesisMode::Direct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::Agent => "agent",
            SynthesisMode::Direct => "direct",
        }
    }
}

impl std::fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request overrides for the direct-call backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl LlmOverrides {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.model.is_none()
            && self.api_base.is_none()
            && self.api_key.is_none()
    }
}

/// Options shared by both request kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynthesisOptions {
    pub language: Language,
    pub mode: SynthesisMode,
    /// Target agent for agent-delegated synthesis; `None` uses the configured default
    pub agent: Option<String>,
    pub llm: LlmOverrides,
    pub skip_synthesis: bool,
}

/// Generate USER.md from a set of links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub links: LinkSet,
    /// Explicit output path (file or directory); `None` installs into the workspace
    pub output: Option<PathBuf>,
    pub options: SynthesisOptions,
}

impl ProfileRequest {
    pub fn new(links: LinkSet, options: SynthesisOptions) -> Result<Self> {
        if links.is_empty() {
            return Err(DomainError::EmptyLinkSet);
        }
        Ok(Self {
            links,
            output: None,
            options,
        })
    }
}

/// How a persona is described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum PersonaMode {
    Prompt(String),
    Template(String),
    Reference(String),
}

impl PersonaMode {
    pub fn label(&self) -> &'static str {
        match self {
            PersonaMode::Prompt(_) => "prompt",
            PersonaMode::Template(_) => "template",
            PersonaMode::Reference(_) => "reference",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            PersonaMode::Prompt(v) | PersonaMode::Template(v) | PersonaMode::Reference(v) => v,
        }
    }
}

/// Generate IDENTITY.md + SOUL.md from a persona description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaRequest {
    pub mode: PersonaMode,
    pub name: Option<String>,
    /// Output directory; `None` installs into the workspace
    pub output: Option<PathBuf>,
    pub options: SynthesisOptions,
}

impl PersonaRequest {
    pub fn new(mode: PersonaMode, options: SynthesisOptions) -> Result<Self> {
        let trimmed = mode.value().trim().to_string();
        if trimmed.is_empty() {
            let what = match mode {
                PersonaMode::Prompt(_) => "description",
                PersonaMode::Template(_) => "template name",
                PersonaMode::Reference(_) => "reference name",
            };
            return Err(DomainError::EmptyPersonaInput(what));
        }
        let mode = match mode {
            PersonaMode::Prompt(_) => PersonaMode::Prompt(trimmed),
            PersonaMode::Template(_) => PersonaMode::Template(trimmed),
            PersonaMode::Reference(_) => PersonaMode::Reference(trimmed),
        };
        Ok(Self {
            mode,
            name: None,
            output: None,
            options,
        })
    }
}

/// Either pipeline's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Profile(ProfileRequest),
    Persona(PersonaRequest),
}

impl Request {
    pub fn options(&self) -> &SynthesisOptions {
        match self {
            Request::Profile(r) => &r.options,
            Request::Persona(r) => &r.options,
        }
    }
}
