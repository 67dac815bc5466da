//! External tool availability checks.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::error::ConverterError;
use super::runner::{ProcessRunner, RunOutcome};
use super::types::ExternalInvocation;
use crate::config::ConverterConfig;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+ version (\S+)").expect("valid version pattern"));

/// Result of checking one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub path: PathBuf,
    pub available: bool,
    /// Version string from the first line of `-version` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Why the tool is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health of the transcoder and the prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHealth {
    pub transcoder: ToolStatus,
    pub prober: ToolStatus,
}

impl ToolHealth {
    /// Conversions need the transcoder; the prober only enriches metadata.
    pub fn is_healthy(&self) -> bool {
        self.transcoder.available
    }

    /// Healthy, but without probing.
    pub fn is_degraded(&self) -> bool {
        self.transcoder.available && !self.prober.available
    }

    /// Fails with `ExternalToolUnavailable` unless the transcoder is usable.
    pub fn ensure_available(&self) -> Result<(), ConverterError> {
        if self.transcoder.available {
            return Ok(());
        }
        Err(ConverterError::ExternalToolUnavailable {
            path: self.transcoder.path.clone(),
            reason: self
                .transcoder
                .error
                .clone()
                .unwrap_or_else(|| "unavailable".to_string()),
        })
    }
}

/// Runs `-version` against both configured tools.
pub async fn check_tools(
    config: &ConverterConfig,
    working_dir: &Path,
    runner: &dyn ProcessRunner,
) -> ToolHealth {
    let health = ToolHealth {
        transcoder: check_tool(&config.ffmpeg_path, working_dir, runner).await,
        prober: check_tool(&config.ffprobe_path, working_dir, runner).await,
    };

    if !health.is_healthy() {
        warn!(
            "Transcoder unavailable at {}: {}",
            health.transcoder.path.display(),
            health.transcoder.error.as_deref().unwrap_or("unknown error")
        );
    } else if health.is_degraded() {
        warn!(
            "Prober unavailable at {}, media metadata will be unknown",
            health.prober.path.display()
        );
    } else {
        info!(
            "Tools ready: ffmpeg {}, ffprobe {}",
            health.transcoder.version.as_deref().unwrap_or("?"),
            health.prober.version.as_deref().unwrap_or("?")
        );
    }

    health
}

async fn check_tool(path: &Path, working_dir: &Path, runner: &dyn ProcessRunner) -> ToolStatus {
    let mut invocation = ExternalInvocation::new(path, working_dir);
    invocation.arg("-version");

    let output = runner.run(&invocation, VERSION_CHECK_TIMEOUT).await;
    let error = match &output.outcome {
        RunOutcome::Completed { code: Some(0) } => None,
        RunOutcome::Completed { code } => Some(format!(
            "-version exited with code {}",
            code.map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string())
        )),
        RunOutcome::TimedOut => Some("-version timed out".to_string()),
        RunOutcome::NotFound => Some("executable not found".to_string()),
        RunOutcome::SpawnFailed(reason) => Some(reason.clone()),
    };

    ToolStatus {
        path: path.to_path_buf(),
        available: error.is_none(),
        version: error
            .is_none()
            .then(|| parse_version(&output.stdout))
            .flatten(),
        error,
    }
}

/// Extracts the version from a line like `ffmpeg version 6.1.1 Copyright ...`.
pub fn parse_version(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    VERSION_RE
        .captures(first).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc"),
            Some("6.1.1-3ubuntu5".to_string())
        );
        assert_eq!(
            parse_version("ffprobe version n7.0 Copyright"),
            Some("n7.0".to_string())
        );
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn test_ensure_available() {
        let status = |available: bool| ToolStatus {
            path: PathBuf::from("ffmpeg"),
            available,
            version: None,
            error: (!available).then(|| "executable not found".to_string()),
        };

        let health = ToolHealth {
            transcoder: status(true),
            prober: status(false),
        };
        assert!(health.ensure_available().is_ok());
        assert!(health.is_degraded());

        let health = ToolHealth {
            transcoder: status(false),
            prober: status(true),
        };
        let err = health.ensure_available().unwrap_err();
        assert!(matches!(err, ConverterError::ExternalToolUnavailable { .. }));
        assert!(!health.is_healthy());
    }
}
