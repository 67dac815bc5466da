//! Error types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error classification that callers branch on.
///
/// Every [`ConverterError`] maps onto exactly one kind, so callers never need
/// to match on diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputNotFound,
    InputUnreadable,
    OutputNotWritable,
    UnsupportedFormat,
    InvalidRequest,
    ExternalToolUnavailable,
    ExternalToolFailed,
    Timeout,
    SizeTargetUnreachable,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputNotFound => "input_not_found",
            Self::InputUnreadable => "input_unreadable",
            Self::OutputNotWritable => "output_not_writable",
            Self::UnsupportedFormat => "unsupported_format",
            Self::InvalidRequest => "invalid_request",
            Self::ExternalToolUnavailable => "external_tool_unavailable",
            Self::ExternalToolFailed => "external_tool_failed",
            Self::Timeout => "timeout",
            Self::SizeTargetUnreachable => "size_target_unreachable",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Input exists but cannot be read as a regular file.
    #[error("Cannot read input file {path}: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    /// Output location cannot be created or written.
    #[error("Cannot write output {path}: {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    /// Target format is not in the allow-list for the media kind.
    #[error("Unsupported target format for {kind}: {format}")]
    UnsupportedFormat { kind: String, format: String },

    /// Input file type could not be classified.
    #[error("Unsupported input type: {path}")]
    UnsupportedInput { path: PathBuf },

    /// Request combines options that do not apply to the input.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Transcoder or prober binary cannot be located or fails its self-check.
    #[error("External tool unavailable at {path}: {reason}")]
    ExternalToolUnavailable { path: PathBuf, reason: String },

    /// Transcoder exited with a nonzero status.
    #[error("FFmpeg exited with code {}: {stderr}", display_code(.exit_code))]
    ExternalToolFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// External process exceeded its allotted time.
    #[error("External process timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The quality ladder was exhausted without meeting the size budget.
    #[error(
        "Could not reach target size of {budget_bytes} bytes after {attempts} attempts (smallest: {})",
        display_size(.smallest_size_bytes)
    )]
    SizeTargetUnreachable {
        budget_bytes: u64,
        attempts: usize,
        smallest_size_bytes: Option<u64>,
        best_effort_path: Option<PathBuf>,
    },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse prober output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn display_size(size: &Option<u64>) -> String {
    size.map(|s| format!("{} bytes", s))
        .unwrap_or_else(|| "no output produced".to_string())
}

impl ConverterError {
    /// Creates an unsupported format error.
    pub fn unsupported_format(kind: impl fmt::Display, format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            kind: kind.to_string(),
            format: format.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. } => ErrorKind::InputNotFound,
            Self::InputUnreadable { .. } => ErrorKind::InputUnreadable,
            Self::OutputNotWritable { .. } => ErrorKind::OutputNotWritable,
            Self::UnsupportedFormat { .. } | Self::UnsupportedInput { .. } => {
                ErrorKind::UnsupportedFormat
            }
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::ExternalToolUnavailable { .. } => ErrorKind::ExternalToolUnavailable,
            Self::ExternalToolFailed { .. } => ErrorKind::ExternalToolFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::SizeTargetUnreachable { .. } => ErrorKind::SizeTargetUnreachable,
            Self::ProbeFailed { .. } | Self::ParseError { .. } | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
