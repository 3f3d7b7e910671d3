// Pipeline Settings
// Plain values the composition root derives from configuration

use crate::domain::{Language, SynthesisMode};
use std::path::PathBuf;
use std::time::Duration;

/// Default collection timeout (3 minutes)
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default agent-delegated synthesis timeout (5 minutes)
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default direct-call synthesis timeout (2 minutes)
pub const DEFAULT_DIRECT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default log excerpt bounds for replies
pub const DEFAULT_LOG_TAIL_LINES: usize = 20;
pub const DEFAULT_LOG_TAIL_CHARS: usize = 1500;

/// External programs the pipeline shells out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSettings {
    /// Link scraper, invoked as `<profile> --no-llm --link <url>...`
    pub profile_collector: String,
    /// Persona spec builder, invoked as `<persona> --dump-spec ...`
    pub persona_collector: String,
    /// Host agent CLI
    pub agent: String,
    /// Argument template for the host agent CLI.
    /// Placeholders: `{agent}`, `{message}`, `{timeout_secs}`, `{language}`
    pub agent_args: Vec<String>,
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self {
            profile_collector: "whoami".to_string(),
            persona_collector: "whoareu".to_string(),
            agent: "openclaw".to_string(),
            agent_args: default_agent_args(),
        }
    }
}

pub fn default_agent_args() -> Vec<String> {
    [
        "agent",
        "--agent",
        "{agent}",
        "--message",
        "{message}",
        "--timeout",
        "{timeout_secs}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Default install directory (agent workspace)
    pub workspace_dir: PathBuf,
    pub collect_timeout: Duration,
    pub agent_timeout: Duration,
    pub direct_timeout: Duration,
    /// Try the direct call when agent-delegated synthesis fails
    pub fallback_enabled: bool,
    pub default_language: Language,
    pub default_mode: SynthesisMode,
    pub default_agent: String,
    pub programs: ProgramSettings,
    pub log_tail_lines: usize,
    pub log_tail_chars: usize,
}

impl PipelineSettings {
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            direct_timeout: DEFAULT_DIRECT_TIMEOUT,
            fallback_enabled: true,
            default_language: Language::Zh,
            default_mode: SynthesisMode::Agent,
            default_agent: "main".to_string(),
            programs: ProgramSettings::default(),
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            log_tail_chars: DEFAULT_LOG_TAIL_CHARS,
        }
    }
}
