//! Types for the converter module.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::{ConverterError, ErrorKind};
use crate::media::normalize_extension;

static DIMENSIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*[xX:]\s*(\d+)\s*$").expect("valid dimensions pattern")
});

/// Abstract quality level.
///
/// Parsing never fails: any unrecognized string resolves to `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// All presets, lowest quality first.
    pub const ALL: [QualityPreset; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parses a preset name, falling back to `Medium` for anything unrecognized.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            other => {
                tracing::debug!("Unrecognized quality preset {:?}, using medium", other);
                Self::Medium
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Index into a `[low, medium, high]` tier row.
    pub(crate) fn tier_index(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl From<String> for QualityPreset {
    fn from(value: String) -> Self {
        Self::parse_lossy(&value)
    }
}

impl From<&str> for QualityPreset {
    fn from(value: &str) -> Self {
        Self::parse_lossy(value)
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete codec parameters. Absent fields mean "leave to the tool".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecParameters {
    /// Target bitrate in kbps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// Constant Rate Factor (lower = better).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crf: Option<u32>,
    /// Format-specific quality scale (direction depends on the format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qscale: Option<u32>,
    /// Output sample rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_rate_hz: Option<u32>,
    /// Output channel count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<u32>,
    /// Encoder compression effort, for formats without a quality knob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<u32>,
}

impl CodecParameters {
    /// Overlays `overrides` on top of `self`, field by field.
    pub fn overlay(self, overrides: &CodecParameters) -> Self {
        Self {
            bitrate_kbps: overrides.bitrate_kbps.or(self.bitrate_kbps),
            crf: overrides.crf.or(self.crf),
            qscale: overrides.qscale.or(self.qscale),
            sampling_rate_hz: overrides.sampling_rate_hz.or(self.sampling_rate_hz),
            channel_count: overrides.channel_count.or(self.channel_count),
            compression_level: overrides.compression_level.or(self.compression_level),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Pixel dimensions, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = DIMENSIONS_RE
            .captures(s)
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let width = caps[1]
            .parse::<u32>()
            .map_err(|e| format!("invalid width in {:?}: {}", s, e))?;
        let height = caps[2]
            .parse::<u32>()
            .map_err(|e| format!("invalid height in {:?}: {}", s, e))?;
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Dimensions {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimensions> for String {
    fn from(value: Dimensions) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed-dimension resize. A missing side is derived by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Fit within the bounds without cropping.
    #[serde(default = "default_true")]
    pub preserve_aspect: bool,
}

fn default_true() -> bool {
    true
}

/// What to do with an image beyond re-encoding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageOperation {
    /// Plain format change.
    #[default]
    Reformat,
    /// Resize to fixed dimensions.
    Resize(ResizeSpec),
    /// Fit within the bounds, then pad (centered) to exactly that size.
    Thumbnail { size: Option<Dimensions> },
}

/// Video-specific request options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoOptions {
    /// Output dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Dimensions>,
    /// Shrink to fit within `scale` instead of stretching to it.
    #[serde(default)]
    pub shrink_to_fit: bool,
    /// Output frame rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    /// Re-encode the audio stream to this audio format. `None` copies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
}

/// Loudness target used when normalization is requested without a level.
pub const DEFAULT_LOUDNESS_LUFS: f32 = -20.0;

/// Audio-specific request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioOptions {
    /// Normalize integrated loudness to this level (LUFS).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize_lufs: Option<f32>,
}

/// A single still frame taken from a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameCapture {
    /// Position in the video, in seconds.
    #[serde(default = "default_capture_at")]
    pub at_secs: f64,
    /// Output dimensions. `None` keeps the video's own size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimensions>,
}

fn default_capture_at() -> f64 {
    1.0
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self {
            at_secs: default_capture_at(),
            size: None,
        }
    }
}

/// A single conversion call.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Target format name (extension-like, e.g. "mp3").
    pub target_format: String,
    /// Quality preset.
    pub preset: QualityPreset,
    /// Explicit parameters; these win over preset values field by field.
    pub overrides: CodecParameters,
    /// Route a video input through audio extraction.
    pub extract_audio: bool,
    /// Image operation (ignored for non-image inputs unless non-default).
    pub image: ImageOperation,
    /// Video options (ignored for non-video inputs unless non-default).
    pub video: VideoOptions,
    /// Audio options, for audio outputs only.
    pub audio: AudioOptions,
    /// Take one still frame from a video input instead of converting it.
    pub frame: Option<FrameCapture>,
}

impl ConversionRequest {
    /// Creates a plain conversion request at medium quality.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        target_format: impl AsRef<str>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            target_format: normalize_extension(target_format.as_ref()),
            preset: QualityPreset::default(),
            overrides: CodecParameters::default(),
            extract_audio: false,
            image: ImageOperation::default(),
            video: VideoOptions::default(),
            audio: AudioOptions::default(),
            frame: None,
        }
    }

    /// Sets the quality preset.
    pub fn with_preset(mut self, preset: impl Into<QualityPreset>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Sets explicit parameter overrides.
    pub fn with_overrides(mut self, overrides: CodecParameters) -> Self {
        self.overrides = overrides;
        self
    }

    /// Requests audio extraction from a video input.
    pub fn extracting_audio(mut self) -> Self {
        self.extract_audio = true;
        self
    }

    /// Sets the image operation.
    pub fn with_image_operation(mut self, operation: ImageOperation) -> Self {
        self.image = operation;
        self
    }

    /// Sets video options.
    pub fn with_video_options(mut self, options: VideoOptions) -> Self {
        self.video = options;
        self
    }

    /// Normalizes loudness to `lufs` on the audio output.
    pub fn normalizing_loudness(mut self, lufs: f32) -> Self {
        self.audio.normalize_lufs = Some(lufs);
        self
    }

    /// Requests a still frame from a video input.
    pub fn capturing_frame(mut self, capture: FrameCapture) -> Self {
        self.frame = Some(capture);
        self
    }

    /// Target format, normalized.
    pub fn target_format(&self) -> String {
        normalize_extension(&self.target_format)
    }
}

/// Output size budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SizeBudget {
    bytes: u64,
}

impl SizeBudget {
    pub fn bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    /// Kilobytes of 1024 bytes; fractional values round down.
    pub fn kilobytes(kb: f64) -> Self {
        Self {
            bytes: (kb.max(0.0) * 1024.0) as u64,
        }
    }

    pub fn as_bytes(&self) -> u64 {
        self.bytes
    }

    pub fn allows(&self, size_bytes: u64) -> bool {
        size_bytes <= self.bytes
    }
}

/// Final result of a conversion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success {
        output_path: PathBuf,
        output_size_bytes: u64,
        elapsed_ms: u64,
        /// Number of transcoder invocations it took.
        attempts: usize,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
        /// Smallest size produced, for size-targeting failures.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_effort_size_bytes: Option<u64>,
        /// Where the smallest attempt was retained, if it was.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        best_effort_path: Option<PathBuf>,
    },
}

impl ConversionOutcome {
    /// Translates an error into a Failure outcome.
    pub fn failure(error: &ConverterError) -> Self {
        let (best_effort_size_bytes, best_effort_path) = match error {
            ConverterError::SizeTargetUnreachable {
                smallest_size_bytes,
                best_effort_path,
                ..
            } => (*smallest_size_bytes, best_effort_path.clone()),
            _ => (None, None),
        };
        Self::Failure {
            kind: error.kind(),
            detail: error.to_string(),
            best_effort_size_bytes,
            best_effort_path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// A fully specified external process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInvocation {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments, in order, excluding the program.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: PathBuf,
}

impl ExternalInvocation {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// Appends one argument.
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a path argument.
    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.to_string_lossy().to_string());
        self
    }

    /// Full argument vector beginning with the program.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Trailing argument, which is the output path for transcoder calls.
    pub fn last_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }

    /// Whether `flag` appears among the arguments.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following the first occurrence of `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Space-joined command line for logging.
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}
