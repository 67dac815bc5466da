//! Media metadata probing through ffprobe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::converter::{ConverterError, ExternalInvocation, ProcessRunner};

/// Stream-level facts extracted from a probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Container format (first of ffprobe's comma-separated names).
    pub format: String,
    /// Duration in seconds.
    pub duration_secs: Option<f64>,
    /// Size in bytes as reported by the prober.
    pub size_bytes: Option<u64>,
    pub audio_codec: Option<String>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u8>,
    pub video_codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
}

/// Reads media metadata from a file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ConverterError>;
}

/// Probes through an ffprobe executable.
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    timeout: Duration,
    working_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl FfprobeProber {
    pub fn new(
        ffprobe_path: impl Into<PathBuf>,
        timeout: Duration,
        working_dir: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
            working_dir: working_dir.into(),
            runner,
        }
    }

    /// Builds the probe invocation for `path`.
    pub fn invocation(&self, path: &Path) -> ExternalInvocation {
        let mut invocation = ExternalInvocation::new(&self.ffprobe_path, &self.working_dir);
        invocation
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .path_arg(path);
        invocation
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ConverterError> {
        let invocation = self.invocation(path);
        let output = self
            .runner
            .run(&invocation, self.timeout)
            .await
            .into_result(&invocation, self.timeout)
            .map_err(|e| match e {
                ConverterError::ExternalToolFailed { stderr, .. } => {
                    ConverterError::probe_failed(format!("ffprobe failed: {}", stderr))
                }
                other => other,
            })?;

        parse_probe_output(&output.stdout)
    }
}

/// Parses ffprobe JSON output.
pub fn parse_probe_output(output: &str) -> Result<ProbeReport, ConverterError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        format: ProbeFormat,
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    #[derive(Deserialize)]
    struct ProbeFormat {
        #[serde(default)]
        format_name: String,
        duration: Option<String>,
        size: Option<String>,
    }

    #[derive(Deserialize)]
    struct ProbeStream {
        codec_type: String,
        codec_name: Option<String>,
        sample_rate: Option<String>,
        channels: Option<u8>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }

    let probe: ProbeOutput =
        serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe output: {}", e),
        })?;

    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");
    let video = probe.streams.iter().find(|s| s.codec_type == "video");

    Ok(ProbeReport {
        format: probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown")
            .to_string(),
        duration_secs: probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok()),
        size_bytes: probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok()),
        audio_codec: audio.and_then(|s| s.codec_name.clone()),
        audio_sample_rate: audio
            .and_then(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse::<u32>().ok()),
        audio_channels: audio.and_then(|s| s.channels),
        video_codec: video.and_then(|s| s.codec_name.clone()),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        fps: video
            .and_then(|s| s.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
    })
}

/// Parses a frame rate like "24000/1001" or "30".
fn parse_frame_rate(rate: &str) -> Option<f32> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse::<f32>().ok(),
    }
}
