pub mod config;
pub mod converter;
pub mod media;
pub mod metrics;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, CompressionConfig,
    Config, ConfigError, ConverterConfig, StorageConfig,
};
pub use converter::{
    check_tools, AudioOptions, CodecParameters, ConversionOutcome, ConversionRequest,
    ConverterDispatcher, ConverterError, Dimensions, ErrorKind, FrameCapture, ImageOperation,
    ProcessRunner, QualityPreset, ResizeSpec, SizeBudget, TokioProcessRunner, ToolHealth,
    VideoOptions,
};
pub use media::{FileClassifier, FileDescriptor, MediaKind};
pub use storage::{ScratchSpace, StorageError, SweepReport};
