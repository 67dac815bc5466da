use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::converter::Dimensions;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for a single transcoder invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for a single prober invocation in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional global ffmpeg arguments, inserted before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Thumbnail bounds used when a request does not name its own.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: Dimensions,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_thumbnail_size() -> Dimensions {
    Dimensions::new(150, 150)
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the transcoder timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Scratch directory layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Freshly received inputs.
    #[serde(default = "default_incoming_dir")]
    pub incoming_dir: PathBuf,
    /// Completed outputs waiting to be collected.
    #[serde(default = "default_converted_dir")]
    pub converted_dir: PathBuf,
    /// Working directory handed to the external tool.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Files older than this are evicted by a sweep.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            incoming_dir: default_incoming_dir(),
            converted_dir: default_converted_dir(),
            working_dir: default_working_dir(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl StorageConfig {
    /// Places all three scratch areas under a single root.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            incoming_dir: root.join("uploads"),
            converted_dir: root.join("converted"),
            working_dir: root.join("temp"),
            max_age_hours: default_max_age_hours(),
        }
    }
}

fn default_incoming_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_converted_dir() -> PathBuf {
    PathBuf::from("converted")
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_max_age_hours() -> u64 {
    24
}

/// Size-targeting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompressionConfig {
    /// Quality ladder per target format, highest quality first.
    ///
    /// Values are in the unit of the format's quality knob (qscale, CRF,
    /// kbps), or a compression level for formats without one.
    #[serde(default = "default_ladders")]
    pub ladders: BTreeMap<String, Vec<u32>>,

    /// Keep the smallest oversized attempt when the budget cannot be met.
    #[serde(default = "default_keep_best_effort")]
    pub keep_best_effort: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ladders: default_ladders(),
            keep_best_effort: default_keep_best_effort(),
        }
    }
}

impl CompressionConfig {
    /// Returns the ladder configured for a target format.
    pub fn ladder_for(&self, format: &str) -> Option<&[u32]> {
        self.ladders.get(format).map(Vec::as_slice)
    }
}

fn default_keep_best_effort() -> bool {
    true
}

fn default_ladders() -> BTreeMap<String, Vec<u32>> {
    let jpeg = vec![5, 10, 15, 20, 25, 30];
    let x264 = vec![20, 24, 28, 32, 36];
    let audio = vec![320, 256, 192, 160, 128, 96, 64];

    let mut ladders = BTreeMap::new();
    ladders.insert("jpg".to_string(), jpeg.clone());
    ladders.insert("jpeg".to_string(), jpeg);
    ladders.insert("webp".to_string(), vec![90, 80, 70, 60, 50, 40, 30]);
    ladders.insert("png".to_string(), vec![9]);
    for format in ["mp4", "avi", "mov", "mkv"] {
        ladders.insert(format.to_string(), x264.clone());
    }
    ladders.insert("webm".to_string(), vec![30, 35, 40, 45, 50]);
    for format in ["mp3", "aac", "ogg", "m4a"] {
        ladders.insert(format.to_string(), audio.clone());
    }
    ladders
}
