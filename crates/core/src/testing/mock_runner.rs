//! Mock process runner for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{ExternalInvocation, ProcessOutput, ProcessRunner, RunOutcome};

/// What the mock does for one transcoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Exit 0 after writing `output_size` bytes to the output path.
    Succeed { output_size: u64 },
    /// Exit nonzero, optionally leaving a partial output behind.
    Fail {
        exit_code: i32,
        stderr: String,
        partial_bytes: u64,
    },
    /// Exceed the time limit, optionally leaving a partial output behind.
    TimeOut { partial_bytes: u64 },
    /// Report the program as missing.
    NotFound,
    /// Exit 0 but leave a non-empty directory where the output file should be.
    DirectoryOutput,
}

impl MockResponse {
    pub fn succeed(output_size: u64) -> Self {
        Self::Succeed { output_size }
    }

    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Fail {
            exit_code,
            stderr: stderr.into(),
            partial_bytes: 0,
        }
    }
}

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// The invocation that was run.
    pub invocation: ExternalInvocation,
    /// The time limit it was given.
    pub timeout: Duration,
}

/// Mock implementation of the ProcessRunner trait.
///
/// Provides controllable behavior for testing:
/// - Track transcoder and prober invocations separately
/// - Script per-invocation responses that write real output files
/// - Answer prober invocations with configured JSON
/// - Simulate a missing toolchain
///
/// # Example
///
/// ```rust,ignore
/// use mediaconv_core::testing::{MockResponse, MockRunner};
///
/// let runner = Arc::new(MockRunner::new());
/// runner.push_responses([
///     MockResponse::succeed(300 * 1024),
///     MockResponse::succeed(95 * 1024),
/// ]).await;
///
/// let dispatcher = ConverterDispatcher::new(config, runner.clone());
/// // ...
/// assert_eq!(runner.transcoder_invocation_count().await, 2);
/// ```
#[derive(Debug)]
pub struct MockRunner {
    /// Recorded transcoder invocations.
    invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    /// Recorded prober invocations.
    probe_invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    /// Responses consumed in order by transcoder invocations.
    script: Arc<RwLock<VecDeque<MockResponse>>>,
    /// Response once the script is exhausted.
    default_response: Arc<RwLock<MockResponse>>,
    /// Prober stdout; `None` makes probes fail.
    probe_output: Arc<RwLock<Option<String>>>,
    /// When set, every program is reported missing.
    tools_missing: Arc<RwLock<bool>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a new mock runner that succeeds with 1 KiB outputs.
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(RwLock::new(Vec::new())),
            probe_invocations: Arc::new(RwLock::new(Vec::new())),
            script: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(MockResponse::succeed(1024))),
            probe_output: Arc::new(RwLock::new(None)),
            tools_missing: Arc::new(RwLock::new(false)),
        }
    }

    /// Queue a response for the next unanswered transcoder invocation.
    pub async fn push_response(&self, response: MockResponse) {
        self.script.write().await.push_back(response);
    }

    /// Queue several responses.
    pub async fn push_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.script.write().await.extend(responses);
    }

    /// Set the response used once the script is exhausted.
    pub async fn set_default_response(&self, response: MockResponse) {
        *self.default_response.write().await = response;
    }

    /// Set the JSON the prober prints.
    pub async fn set_probe_output(&self, json: impl Into<String>) {
        *self.probe_output.write().await = Some(json.into());
    }

    /// Report every program as missing.
    pub async fn set_tools_missing(&self, missing: bool) {
        *self.tools_missing.write().await = missing;
    }

    /// Get all recorded transcoder invocations.
    pub async fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.read().await.clone()
    }

    /// Get the number of transcoder invocations performed.
    pub async fn transcoder_invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }

    /// Get all recorded prober invocations.
    pub async fn probe_invocations(&self) -> Vec<RecordedInvocation> {
        self.probe_invocations.read().await.clone()
    }

    /// Transcoder plus prober invocations.
    pub async fn total_invocation_count(&self) -> usize {
        self.invocations.read().await.len() + self.probe_invocations.read().await.len()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded(&self) {
        self.invocations.write().await.clear();
        self.probe_invocations.write().await.clear();
    }

    async fn next_response(&self) -> MockResponse {
        match self.script.write().await.pop_front() {
            Some(response) => response,
            None => self.default_response.read().await.clone(),
        }
    }

    fn is_prober(invocation: &ExternalInvocation) -> bool {
        invocation
            .program
            .file_stem()
            .map(|s| s.to_string_lossy().contains("ffprobe"))
            .unwrap_or(false)
    }

    fn output(outcome: RunOutcome, stdout: String, stderr: String) -> ProcessOutput {
        ProcessOutput {
            outcome,
            stdout,
            stderr,
            elapsed: Duration::from_millis(1),
        }
    }

    async fn run_prober(&self, invocation: &ExternalInvocation) -> ProcessOutput {
        match self.probe_output.read().await.clone() {
            Some(json) => Self::output(RunOutcome::Completed { code: Some(0) }, json, String::new()),
            None => Self::output(
                RunOutcome::Completed { code: Some(1) },
                String::new(),
                format!(
                    "{}: Invalid data found when processing input",
                    invocation.last_arg().unwrap_or_default()
                ),
            ),
        }
    }

    async fn run_transcoder(&self, invocation: &ExternalInvocation) -> ProcessOutput {
        let output_path = invocation.last_arg().map(Path::new);

        match self.next_response().await {
            MockResponse::Succeed { output_size } => {
                if let Some(path) = output_path {
                    write_file(path, output_size).await;
                }
                Self::output(
                    RunOutcome::Completed { code: Some(0) },
                    String::new(),
                    String::new(),
                )
            }
            MockResponse::Fail {
                exit_code,
                stderr,
                partial_bytes,
            } => {
                if let (Some(path), true) = (output_path, partial_bytes > 0) {
                    write_file(path, partial_bytes).await;
                }
                Self::output(
                    RunOutcome::Completed {
                        code: Some(exit_code),
                    },
                    String::new(),
                    stderr,
                )
            }
            MockResponse::TimeOut { partial_bytes } => {
                if let (Some(path), true) = (output_path, partial_bytes > 0) {
                    write_file(path, partial_bytes).await;
                }
                Self::output(RunOutcome::TimedOut, String::new(), String::new())
            }
            MockResponse::NotFound => {
                Self::output(RunOutcome::NotFound, String::new(), String::new())
            }
            MockResponse::DirectoryOutput => {
                if let Some(path) = output_path {
                    // A long entry name keeps the directory's reported size
                    // above a few bytes on every filesystem.
                    write_file(&path.join("segment-000000000000000000000000.part"), 1).await;
                }
                Self::output(
                    RunOutcome::Completed { code: Some(0) },
                    String::new(),
                    String::new(),
                )
            }
        }
    }
}

async fn write_file(path: &Path, size: u64) {
    if let Some(parent) = path.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    let _ = tokio::fs::write(path, vec![0u8; size as usize]).await;
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, invocation: &ExternalInvocation, timeout: Duration) -> ProcessOutput {
        if *self.tools_missing.read().await {
            return Self::output(RunOutcome::NotFound, String::new(), String::new());
        }

        // Self-checks are answered without touching the script.
        if invocation.args == ["-version"] {
            let name = invocation
                .program
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            return Self::output(
                RunOutcome::Completed { code: Some(0) },
                format!("{} version 6.1-mock Copyright (c) 2000-2024\n", name),
                String::new(),
            );
        }

        let recorded = RecordedInvocation {
            invocation: invocation.clone(),
            timeout,
        };

        if Self::is_prober(invocation) {
            self.probe_invocations.write().await.push(recorded);
            self.run_prober(invocation).await
        } else {
            self.invocations.write().await.push(recorded);
            self.run_transcoder(invocation).await
        }
    }
}
