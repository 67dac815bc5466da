//! External process execution.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::ConverterError;
use super::types::ExternalInvocation;
use crate::metrics;

/// How an external process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited. `code` is `None` when it was killed by a signal.
    Completed { code: Option<i32> },
    /// The process exceeded its time limit and was killed.
    TimedOut,
    /// The program could not be found.
    NotFound,
    /// The process could not be started for another reason.
    SpawnFailed(String),
}

/// Captured result of one external process run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub outcome: RunOutcome,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Whether the process exited with status 0.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { code: Some(0) })
    }

    /// Maps a non-successful run onto the converter error taxonomy.
    pub fn into_result(
        self,
        invocation: &ExternalInvocation,
        timeout: Duration,
    ) -> Result<ProcessOutput, ConverterError> {
        match &self.outcome {
            RunOutcome::Completed { code: Some(0) } => Ok(self),
            RunOutcome::Completed { code } => Err(ConverterError::ExternalToolFailed {
                exit_code: *code,
                stderr: self.stderr.trim().to_string(),
            }),
            RunOutcome::TimedOut => Err(ConverterError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
            RunOutcome::NotFound => Err(ConverterError::ExternalToolUnavailable {
                path: invocation.program.clone(),
                reason: "executable not found".to_string(),
            }),
            RunOutcome::SpawnFailed(reason) => Err(ConverterError::ExternalToolUnavailable {
                path: invocation.program.clone(),
                reason: reason.clone(),
            }),
        }
    }

    fn status_label(&self) -> &'static str {
        match self.outcome {
            RunOutcome::Completed { code: Some(0) } => "success",
            RunOutcome::Completed { .. } => "failed",
            RunOutcome::TimedOut => "timeout",
            RunOutcome::NotFound | RunOutcome::SpawnFailed(_) => "unavailable",
        }
    }
}

/// Runs external programs with a time limit.
///
/// Implementations never return an error: every way a run can end is
/// reported through [`RunOutcome`], so callers decide how to classify it.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &ExternalInvocation, timeout: Duration) -> ProcessOutput;
}

/// Runs processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &ExternalInvocation, timeout: Duration) -> ProcessOutput {
        let started = Instant::now();
        let finish = |outcome: RunOutcome, stdout: String, stderr: String| {
            let output = ProcessOutput {
                outcome,
                stdout,
                stderr,
                elapsed: started.elapsed(),
            };
            metrics::EXTERNAL_TOOL_INVOCATIONS
                .with_label_values(&[tool_label(invocation).as_str(), output.status_label()])
                .inc();
            output
        };

        if let Err(e) = tokio::fs::create_dir_all(&invocation.working_dir).await {
            warn!(
                "Could not create working directory {}: {}",
                invocation.working_dir.display(),
                e
            );
        }

        debug!("Running: {}", invocation.command_line());

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return finish(RunOutcome::NotFound, String::new(), String::new());
            }
            Err(e) => {
                return finish(
                    RunOutcome::SpawnFailed(e.to_string()),
                    String::new(),
                    String::new(),
                );
            }
        };

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => finish(
                RunOutcome::Completed {
                    code: output.status.code(),
                },
                String::from_utf8_lossy(&output.stdout).to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ),
            Ok(Err(e)) => finish(
                RunOutcome::SpawnFailed(e.to_string()),
                String::new(),
                String::new(),
            ),
            Err(_) => {
                warn!(
                    "{} exceeded {}s, killed",
                    invocation.program.display(),
                    timeout.as_secs()
                );
                finish(RunOutcome::TimedOut, String::new(), String::new())
            }
        }
    }
}

fn tool_label(invocation: &ExternalInvocation) -> String {
    invocation
        .program
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> ExternalInvocation {
        let mut invocation = ExternalInvocation::new(program, std::env::temp_dir());
        invocation.args(args.iter().copied());
        invocation
    }

    #[tokio::test]
    async fn test_missing_program_reports_not_found() {
        let runner = TokioProcessRunner::new();
        let inv = invocation("/nonexistent/definitely-not-ffmpeg", &["-version"]);
        let output = runner.run(&inv, Duration::from_secs(5)).await;
        assert_eq!(output.outcome, RunOutcome::NotFound);

        let err = output.into_result(&inv, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ConverterError::ExternalToolUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_exit_code_and_stderr() {
        let runner = TokioProcessRunner::new();
        let inv = invocation("sh", &["-c", "echo boom >&2; exit 3"]);
        let output = runner.run(&inv, Duration::from_secs(5)).await;
        assert_eq!(output.outcome, RunOutcome::Completed { code: Some(3) });
        assert!(output.stderr.contains("boom"));
        assert!(!output.succeeded());

        match output.into_result(&inv, Duration::from_secs(5)) {
            Err(ConverterError::ExternalToolFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected tool failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_stdout() {
        let runner = TokioProcessRunner::new();
        let inv = invocation("sh", &["-c", "echo hello"]);
        let output = runner.run(&inv, Duration::from_secs(5)).await;
        assert!(output.succeeded());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = TokioProcessRunner::new();
        let inv = invocation("sh", &["-c", "sleep 10"]);
        let output = runner.run(&inv, Duration::from_millis(200)).await;
        assert_eq!(output.outcome, RunOutcome::TimedOut);
        assert!(output.elapsed < Duration::from_secs(5));

        let err = output
            .into_result(&inv, Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, ConverterError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_creates_missing_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        let workdir = temp.path().join("scratch").join("working");
        let mut inv = ExternalInvocation::new("sh", &workdir);
        inv.args(["-c", "pwd"]);

        let output = TokioProcessRunner::new()
            .run(&inv, Duration::from_secs(5))
            .await;
        assert!(output.succeeded());
        assert!(workdir.is_dir());
    }
}
