//! Command line definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use mediaconv_core::{CodecParameters, Dimensions, QualityPreset};

/// Convert audio, video and images with ffmpeg
#[derive(Parser, Debug)]
#[command(name = "mediaconv")]
#[command(about = "Convert audio, video and images with ffmpeg", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults plus MEDIACONV_* environment when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics to stderr after the command finishes
    #[arg(long, global = true)]
    pub print_metrics: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that ffmpeg and ffprobe can be executed
    Check,

    /// Convert a file to another format
    Convert {
        #[command(flatten)]
        target: TargetArgs,

        /// Output dimensions for video, as WIDTHxHEIGHT
        #[arg(long)]
        scale: Option<Dimensions>,

        /// Fit video inside --scale instead of stretching to it
        #[arg(long, requires = "scale")]
        shrink_to_fit: bool,

        /// Output frame rate for video
        #[arg(long)]
        fps: Option<f32>,

        /// Re-encode the video's audio track to this format instead of copying it
        #[arg(long)]
        audio_format: Option<String>,

        #[command(flatten)]
        loudness: LoudnessArgs,
    },

    /// Extract the audio track of a video
    ExtractAudio {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        loudness: LoudnessArgs,
    },

    /// Save one frame of a video as an image
    VideoThumbnail {
        #[command(flatten)]
        target: TargetArgs,

        /// Position of the frame in seconds
        #[arg(long, default_value_t = 1.0)]
        at: f64,

        /// Scale the frame to WIDTHxHEIGHT
        #[arg(long)]
        size: Option<Dimensions>,
    },

    /// Resize an image
    Resize {
        #[command(flatten)]
        target: TargetArgs,

        /// Target width in pixels
        #[arg(long, required_unless_present = "height")]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Stretch to exactly WIDTHxHEIGHT
        #[arg(long)]
        ignore_aspect: bool,
    },

    /// Produce a padded thumbnail of an image
    Thumbnail {
        #[command(flatten)]
        target: TargetArgs,

        /// Thumbnail bounds as WIDTHxHEIGHT (configured default when omitted)
        #[arg(long)]
        size: Option<Dimensions>,
    },

    /// Convert while keeping the output under a size budget
    Compress {
        #[command(flatten)]
        target: TargetArgs,

        /// Size budget in kilobytes (1 KB = 1024 bytes)
        #[arg(long)]
        max_kb: f64,
    },

    /// Remove scratch files older than the configured age
    Sweep {
        /// Override the configured maximum age in hours
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
}

/// Input, output and encoding settings shared by every conversion command.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Input file
    pub input: PathBuf,

    /// Target format (file extension)
    #[arg(short, long)]
    pub format: String,

    /// Output file (fresh name in the converted area when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Quality preset: low, medium or high
    #[arg(short, long, default_value = "medium")]
    pub quality: QualityPreset,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Loudness normalization for audio outputs.
#[derive(Args, Debug, Default)]
pub struct LoudnessArgs {
    /// Normalize loudness to this integrated level in LUFS (-20 when no value is given)
    #[arg(
        long,
        value_name = "LUFS",
        num_args = 0..=1,
        default_missing_value = "-20",
        allow_negative_numbers = true
    )]
    pub normalize: Option<f32>,
}

/// Explicit encoder parameters, taking precedence over the preset.
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Audio bitrate in kbps
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Constant rate factor for video
    #[arg(long)]
    pub crf: Option<u32>,

    /// Quality scale for jpeg
    #[arg(long)]
    pub qscale: Option<u32>,

    /// Audio sampling rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Audio channel count
    #[arg(long)]
    pub channels: Option<u32>,

    /// Encoder compression level
    #[arg(long)]
    pub compression_level: Option<u32>,
}

impl From<&OverrideArgs> for CodecParameters {
    fn from(args: &OverrideArgs) -> Self {
        CodecParameters {
            bitrate_kbps: args.bitrate,
            crf: args.crf,
            qscale: args.qscale,
            sampling_rate_hz: args.sample_rate,
            channel_count: args.channels,
            compression_level: args.compression_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "mediaconv", "convert", "in.mov", "-f", "mp4", "-q", "ultra", "--scale", "1280x720",
            "--crf", "21",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert { target, scale, .. } => {
                assert_eq!(target.format, "mp4");
                assert_eq!(target.quality, QualityPreset::Medium);
                assert_eq!(scale, Some(Dimensions::new(1280, 720)));
                assert_eq!(CodecParameters::from(&target.overrides).crf, Some(21));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resize_needs_a_dimension() {
        let err = Cli::try_parse_from(["mediaconv", "resize", "a.png", "-f", "jpg"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from(["mediaconv", "resize", "a.png", "-f", "jpg", "--height", "90"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Resize {
                height: Some(90),
                ..
            }
        ));
    }

    #[test]
    fn test_normalize_flag() {
        let cli = Cli::try_parse_from(["mediaconv", "extract-audio", "a.mkv", "-f", "mp3", "--normalize"])
            .unwrap();
        match cli.command {
            Commands::ExtractAudio { loudness, .. } => assert_eq!(loudness.normalize, Some(-20.0)),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "mediaconv", "convert", "a.wav", "-f", "ogg", "--normalize", "-16",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert { loudness, .. } => assert_eq!(loudness.normalize, Some(-16.0)),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["mediaconv", "convert", "a.wav", "-f", "ogg"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Convert {
                loudness: LoudnessArgs { normalize: None },
                ..
            }
        ));
    }

    #[test]
    fn test_parse_video_thumbnail() {
        let cli = Cli::try_parse_from([
            "mediaconv", "video-thumbnail", "clip.mp4", "-f", "jpg", "--at", "12.5", "--size", "320x240",
        ])
        .unwrap();
        match cli.command {
            Commands::VideoThumbnail { at, size, .. } => {
                assert_eq!(at, 12.5);
                assert_eq!(size, Some(Dimensions::new(320, 240)));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["mediaconv", "video-thumbnail", "clip.mp4", "-f", "png"])
            .unwrap();
        assert!(matches!(cli.command, Commands::VideoThumbnail { at, size: None, .. } if at == 1.0));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["mediaconv", "check", "--log-json", "--config", "m.toml"])
            .unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("m.toml")));
    }
}
