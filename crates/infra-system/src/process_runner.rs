// Subprocess runner
// Spawns collectors and the host agent CLI with a hard wall-clock timeout
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use wwa_core::port::{CommandRunResult, CommandSpec, ProcessRunner, RunStatus};

/// Per-stream capture limit (1 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Time between SIGTERM and SIGKILL
pub const DEFAULT_TERM_GRACE: Duration = Duration::from_secs(3);

/// How long to wait for pipes to close after the child is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Capture {
    bytes: Vec<u8>,
    dropped: usize,
}

/// Tokio-backed `ProcessRunner`.
///
/// Output beyond the limit is read and discarded (so the child never blocks
/// on a full pipe) and the result is flagged as truncated.
pub struct TokioProcessRunner {
    max_output_bytes: usize,
    term_grace: Duration,
}

impl TokioProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self {
            max_output_bytes: max_output_bytes.max(1),
            term_grace: DEFAULT_TERM_GRACE,
        }
    }

    pub fn with_term_grace(mut self, grace: Duration) -> Self {
        self.term_grace = grace;
        self
    }

    /// SIGTERM first, then SIGKILL once the grace period runs out
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                debug!(pid = %pid, "Sending SIGTERM");
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    if let Ok(Ok(_)) = timeout(self.term_grace, child.wait()).await {
                        return;
                    }
                    warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
                }
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill timed-out process");
        }
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

fn pump<R>(reader: Option<R>, limit: usize) -> (Arc<Mutex<Capture>>, Option<JoinHandle<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let capture = Arc::new(Mutex::new(Capture::default()));
    let Some(mut reader) = reader else {
        return (capture, None);
    };
    let sink = capture.clone();
    let handle = tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let mut cap = sink.lock().unwrap_or_else(|e| e.into_inner());
                    let room = limit.saturating_sub(cap.bytes.len());
                    let keep = n.min(room);
                    cap.bytes.extend_from_slice(&chunk[..keep]);
                    cap.dropped += n - keep;
                }
            }
        }
    });
    (capture, Some(handle))
}

/// Wait for a reader to hit EOF (bounded), then take what it captured.
async fn collect(capture: Arc<Mutex<Capture>>, handle: Option<JoinHandle<()>>) -> (String, bool) {
    if let Some(mut handle) = handle {
        if timeout(DRAIN_TIMEOUT, &mut handle).await.is_err() {
            // A grandchild may still hold the pipe open
            handle.abort();
        }
    }
    let cap = capture.lock().unwrap_or_else(|e| e.into_inner());
    (String::from_utf8_lossy(&cap.bytes).into_owned(), cap.dropped > 0)
}

enum Waited {
    Exited(ExitStatus),
    WaitFailed(String),
    TimedOut,
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandRunResult {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %spec.program, error = %e, "Failed to start process");
                return CommandRunResult::not_started(e.to_string());
            }
        };
        info!(
            command = %spec.display(),
            pid = ?child.id(),
            timeout_secs = spec.timeout.as_secs(),
            "Process started"
        );

        let (stdout, stdout_task) = pump(child.stdout.take(), self.max_output_bytes);
        let (stderr, stderr_task) = pump(child.stderr.take(), self.max_output_bytes);

        let waited = match timeout(spec.timeout, child.wait()).await {
            Ok(Ok(status)) => Waited::Exited(status),
            Ok(Err(e)) => Waited::WaitFailed(e.to_string()),
            Err(_) => {
                warn!(program = %spec.program, timeout_secs = spec.timeout.as_secs(), "Process timed out");
                self.terminate(&mut child).await;
                Waited::TimedOut
            }
        };

        let (stdout, stdout_truncated) = collect(stdout, stdout_task).await;
        let (mut stderr, stderr_truncated) = collect(stderr, stderr_task).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let (status, exit_code) = match waited {
            Waited::Exited(status) if status.success() => (RunStatus::Succeeded, status.code()),
            Waited::Exited(status) => (
                RunStatus::Failed {
                    exit_code: status.code(),
                },
                status.code(),
            ),
            Waited::WaitFailed(reason) => {
                if !stderr.is_empty() {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("wait failed: {}", reason));
                (RunStatus::Failed { exit_code: None }, None)
            }
            Waited::TimedOut => (
                RunStatus::TimedOut {
                    after_ms: spec.timeout.as_millis() as u64,
                },
                None,
            ),
        };

        info!(
            program = %spec.program,
            status = ?status,
            duration_ms,
            stdout_bytes = stdout.len(),
            stdout_truncated,
            "Process finished"
        );

        CommandRunResult {
            status,
            exit_code,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            duration_ms,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> CommandSpec {
        CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let runner = TokioProcessRunner::default();
        let result = runner
            .run(&sh("echo hello; echo oops >&2", Duration::from_secs(5)))
            .await;

        assert!(result.is_success());
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failed_not_error() {
        let runner = TokioProcessRunner::default();
        let result = runner.run(&sh("echo bad >&2; exit 3", Duration::from_secs(5))).await;

        assert_eq!(result.status, RunStatus::Failed { exit_code: Some(3) });
        assert!(result.was_started());
        assert_eq!(result.stderr.trim(), "bad");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_started() {
        let runner = TokioProcessRunner::default();
        let spec = CommandSpec::new(
            "definitely-not-a-real-program-wwa",
            vec![],
            Duration::from_secs(5),
        );
        let result = runner.run(&spec).await;

        assert!(matches!(result.status, RunStatus::NotStarted(_)));
        assert!(!result.was_started());
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let runner = TokioProcessRunner::default().with_term_grace(Duration::from_millis(200));
        let started = Instant::now();
        let result = runner
            .run(&sh("echo partial; exec sleep 30", Duration::from_millis(300)))
            .await;

        assert_eq!(result.status, RunStatus::TimedOut { after_ms: 300 });
        assert_eq!(result.stdout.trim(), "partial");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_output_is_bounded() {
        let runner = TokioProcessRunner::new(1000);
        let result = runner
            .run(&sh("yes x | head -c 100000", Duration::from_secs(10)))
            .await;

        assert!(result.is_success());
        assert_eq!(result.stdout.len(), 1000);
        assert!(result.stdout_truncated);
        assert!(!result.stderr_truncated);
    }

    #[tokio::test]
    async fn test_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::default();
        let spec = sh("pwd; echo $WWA_TEST_VALUE", Duration::from_secs(5))
            .with_cwd(dir.path())
            .with_env("WWA_TEST_VALUE", "42");
        let result = runner.run(&spec).await;

        let lines: Vec<&str> = result.stdout.lines().collect();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(lines[0]).canonicalize().unwrap(),
            expected
        );
        assert_eq!(lines[1], "42");
    }
}
