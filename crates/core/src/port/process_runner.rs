// Process Runner Port
// Abstraction for running external programs (collectors, host agent CLI)

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    /// Extra environment on top of the inherited one
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            timeout,
            env: HashMap::new(),
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Program and args joined for log lines.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| {
            if a.len() > 60 {
                format!("<{} chars>", a.chars().count())
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The process could not be started (missing binary, bad cwd, ...)
    NotStarted(String),
    /// Started and exited unsuccessfully (`None` when killed by a signal)
    Failed { exit_code: Option<i32> },
    /// Killed after exceeding its wall-clock budget
    TimedOut { after_ms: u64 },
    Succeeded,
}

/// Captured result of one subprocess invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunResult {
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: i64,
}

impl CommandRunResult {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Succeeded,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed {
                exit_code: Some(exit_code),
            },
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: 0,
        }
    }

    pub fn timed_out(after_ms: u64, stderr: impl Into<String>) -> Self {
        Self {
            status: RunStatus::TimedOut { after_ms },
            exit_code: None,
            stdout: String::new(),
            stderr: stderr.into(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: after_ms as i64,
        }
    }

    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::NotStarted(reason.into()),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn was_started(&self) -> bool {
        !matches!(self.status, RunStatus::NotStarted(_))
    }

    /// One-line description of a non-successful run.
    pub fn describe_failure(&self) -> String {
        match &self.status {
            RunStatus::NotStarted(reason) => format!("could not start: {}", reason),
            RunStatus::Failed {
                exit_code: Some(code),
            } => format!("exited with code {}", code),
            RunStatus::Failed { exit_code: None } => "terminated by signal".to_string(),
            RunStatus::TimedOut { after_ms } => {
                format!("timed out after {}s", after_ms.div_ceil(1000))
            }
            RunStatus::Succeeded => "succeeded".to_string(),
        }
    }

    /// Best diagnostic text: stderr, else stdout.
    pub fn diagnostics(&self) -> Option<String> {
        if !self.stderr.trim().is_empty() {
            Some(self.stderr.clone())
        } else if !self.stdout.trim().is_empty() {
            Some(self.stdout.clone())
        } else {
            None
        }
    }
}

/// Process Runner trait
///
/// Implementations never fail past their boundary: a spawn failure is
/// reported as `RunStatus::NotStarted`, a timeout as `RunStatus::TimedOut`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> CommandRunResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted results per program name and records every call.
    ///
    /// The last scripted result for a program is repeated once the queue runs dry.
    #[derive(Default)]
    pub struct ScriptedProcessRunner {
        scripts: Mutex<HashMap<String, VecDeque<CommandRunResult>>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedProcessRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, program: &str, result: CommandRunResult) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(result);
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
            self.calls()
                .into_iter()
                .filter(|c| c.program == program)
                .collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedProcessRunner {
        async fn run(&self, spec: &CommandSpec) -> CommandRunResult {
            self.calls.lock().unwrap().push(spec.clone());

            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&spec.program) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) if queue.len() == 1 => queue[0].clone(),
                _ => CommandRunResult::not_started(format!(
                    "no script for program '{}'",
                    spec.program
                )),
            }
        }
    }
}
