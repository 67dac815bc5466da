//! Media classification and metadata probing.

mod classifier;
mod kind;
mod probe;

pub use classifier::{FileClassifier, FileDescriptor};
pub use kind::{normalize_extension, MediaKind};
pub use probe::{parse_probe_output, FfprobeProber, MediaProber, ProbeReport};
