//! Layered configuration: built-in defaults, TOML file, `WWA__SECTION__KEY` variables.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wwa_core::application::settings::{
    default_agent_args, DEFAULT_LOG_TAIL_CHARS, DEFAULT_LOG_TAIL_LINES,
};
use wwa_core::application::{PipelineSettings, ProgramSettings};
use wwa_core::domain::{Language, SynthesisMode};
use wwa_infra_llm::LlmSettings;
use wwa_infra_system::process_runner::DEFAULT_MAX_OUTPUT_BYTES;

pub const DEFAULT_CONFIG_PATH: &str = "~/.wwa/config.toml";
pub const DEFAULT_STATE_DB: &str = "~/.wwa/queue.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Install directory; unset means the OpenClaw agent workspace
    pub workspace_dir: Option<String>,
    pub state_db: String,
    pub timeouts: TimeoutConfig,
    pub synthesis: SynthesisConfig,
    pub programs: ProgramConfig,
    pub limits: LimitsConfig,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            state_db: DEFAULT_STATE_DB.to_string(),
            timeouts: TimeoutConfig::default(),
            synthesis: SynthesisConfig::default(),
            programs: ProgramConfig::default(),
            limits: LimitsConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub collect_secs: u64,
    pub agent_secs: u64,
    pub direct_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            collect_secs: 180,
            agent_secs: 300,
            direct_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub default_mode: String,
    pub fallback_enabled: bool,
    pub default_language: String,
    pub default_agent: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            default_mode: "agent".to_string(),
            fallback_enabled: true,
            default_language: "zh".to_string(),
            default_agent: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub profile: String,
    pub persona: String,
    pub agent: String,
    pub agent_args: Vec<String>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        let programs = ProgramSettings::default();
        Self {
            profile: programs.profile_collector,
            persona: programs.persona_collector,
            agent: programs.agent,
            agent_args: default_agent_args(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_output_bytes: usize,
    pub log_tail_lines: usize,
    pub log_tail_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            log_tail_chars: DEFAULT_LOG_TAIL_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

/// Expand a leading `~`.
pub fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw.trim()).into_owned())
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; the default `~/.wwa/config.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (expand(DEFAULT_CONFIG_PATH), false),
        };

        let source = File::from(file.as_path())
            .format(FileFormat::Toml)
            .required(required);

        Config::builder()
            .add_source(source)
            .add_source(
                Environment::with_prefix("WWA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn state_db_path(&self) -> PathBuf {
        expand(&self.state_db)
    }

    pub fn pipeline_settings(&self, workspace_dir: PathBuf) -> Result<PipelineSettings> {
        let Some(default_language) = Language::parse(&self.synthesis.default_language) else {
            bail!(
                "synthesis.default_language must be zh or en (got '{}')",
                self.synthesis.default_language
            );
        };
        let Some(default_mode) = SynthesisMode::parse(&self.synthesis.default_mode) else {
            bail!(
                "synthesis.default_mode must be agent or direct (got '{}')",
                self.synthesis.default_mode
            );
        };
        if self.programs.agent_args.is_empty() {
            bail!("programs.agent_args must not be empty");
        }

        let mut settings = PipelineSettings::new(workspace_dir);
        settings.collect_timeout = Duration::from_secs(self.timeouts.collect_secs.max(1));
        settings.agent_timeout = Duration::from_secs(self.timeouts.agent_secs.max(1));
        settings.direct_timeout = Duration::from_secs(self.timeouts.direct_secs.max(1));
        settings.fallback_enabled = self.synthesis.fallback_enabled;
        settings.default_language = default_language;
        settings.default_mode = default_mode;
        settings.default_agent = self.synthesis.default_agent.clone();
        settings.programs = ProgramSettings {
            profile_collector: self.programs.profile.clone(),
            persona_collector: self.programs.persona.clone(),
            agent: self.programs.agent.clone(),
            agent_args: self.programs.agent_args.clone(),
        };
        settings.log_tail_lines = self.limits.log_tail_lines;
        settings.log_tail_chars = self.limits.log_tail_chars;
        Ok(settings)
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.llm.provider.clone(),
            model: self.llm.model.clone(),
            api_base: self.llm.api_base.clone(),
            api_key: self.llm.api_key.clone(),
        }
    }
}
