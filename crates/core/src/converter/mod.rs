//! Converter module for transcoding media files.
//!
//! This module turns a [`ConversionRequest`] into one or more FFmpeg
//! invocations and reports a [`ConversionOutcome`].
//!
//! # Features
//!
//! - Audio, video and image conversion from one table-driven command builder
//! - Audio extraction from video
//! - Image resize and padded thumbnails
//! - Size-targeted compression over a configurable quality ladder
//! - Removal of partial output on every failure path
//!
//! # Example
//!
//! ```ignore
//! use mediaconv_core::converter::{ConverterDispatcher, ConversionRequest, TokioProcessRunner};
//!
//! let dispatcher = ConverterDispatcher::new(Arc::new(config), Arc::new(TokioProcessRunner::new()));
//!
//! let request = ConversionRequest::new("uploads/sample.wav", "converted/sample.mp3", "mp3")
//!     .with_preset("high");
//! match dispatcher.convert(request).await {
//!     ConversionOutcome::Success { output_path, elapsed_ms, .. } => {
//!         println!("Wrote {} in {} ms", output_path.display(), elapsed_ms);
//!     }
//!     ConversionOutcome::Failure { kind, detail, .. } => {
//!         eprintln!("{}: {}", kind, detail);
//!     }
//! }
//! ```

mod cleanup;
mod command;
mod compressor;
mod dispatcher;
mod error;
pub mod formats;
mod health;
mod presets;
mod runner;
mod types;

pub use cleanup::{discard_output, prepare_output, validate_input};
pub use command::{CommandBuilder, Route};
pub use compressor::{best_effort_path, Ladder};
pub use dispatcher::{ConverterDispatcher, PreparedConversion};
pub use error::{ConverterError, ErrorKind};
pub use formats::{FormatSpec, ParameterFamily, QualityKnob};
pub use health::{check_tools, parse_version, ToolHealth, ToolStatus};
pub use presets::{QualityPresetTable, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE_HZ};
pub use runner::{ProcessOutput, ProcessRunner, RunOutcome, TokioProcessRunner};
pub use types::{
    AudioOptions, CodecParameters, ConversionOutcome, ConversionRequest, Dimensions,
    ExternalInvocation, FrameCapture, ImageOperation, QualityPreset, ResizeSpec, SizeBudget,
    VideoOptions, DEFAULT_LOUDNESS_LUFS,
};
