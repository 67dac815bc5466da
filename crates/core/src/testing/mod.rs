//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`ProcessRunner`](crate::converter::ProcessRunner)
//! so the whole pipeline can be exercised without FFmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediaconv_core::testing::{fixtures, MockResponse, MockRunner};
//!
//! let root = tempfile::tempdir()?;
//! let config = Arc::new(fixtures::scratch_config(root.path()));
//! let runner = Arc::new(MockRunner::new());
//! runner.push_response(MockResponse::succeed(4096)).await;
//!
//! let dispatcher = ConverterDispatcher::new(config, runner.clone());
//! ```

mod mock_runner;

pub use mock_runner::{MockResponse, MockRunner, RecordedInvocation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::config::{Config, StorageConfig};

    /// Configuration with all scratch areas under `root`.
    pub fn scratch_config(root: &Path) -> Config {
        Config {
            storage: StorageConfig::rooted_at(root),
            ..Default::default()
        }
    }

    /// Write an input file of `size` bytes into `dir`.
    pub fn write_input(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, vec![0x5a; size]).expect("write fixture input");
        path
    }

    /// Prober JSON for an audio file.
    pub fn audio_probe_json(duration_secs: f64) -> String {
        format!(
            r#"{{
  "format": {{ "format_name": "wav", "duration": "{duration_secs}" }},
  "streams": [
    {{ "codec_type": "audio", "codec_name": "pcm_s16le", "sample_rate": "44100", "channels": 2 }}
  ]
}}"#
        )
    }

    /// Prober JSON for a video file with an audio track.
    pub fn video_probe_json(width: u32, height: u32, duration_secs: f64) -> String {
        format!(
            r#"{{
  "format": {{ "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "{duration_secs}" }},
  "streams": [
    {{ "codec_type": "video", "codec_name": "h264", "width": {width}, "height": {height}, "r_frame_rate": "30/1" }},
    {{ "codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2 }}
  ]
}}"#
        )
    }

    /// Prober JSON for a still image.
    pub fn image_probe_json(width: u32, height: u32) -> String {
        format!(
            r#"{{
  "format": {{ "format_name": "png_pipe" }},
  "streams": [
    {{ "codec_type": "video", "codec_name": "png", "width": {width}, "height": {height} }}
  ]
}}"#
        )
    }
}
