//! Request routing and the validate/run/clean-up wrapper.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cleanup;
use super::command::{CommandBuilder, Route};
use super::compressor::SizeTargetingCompressor;
use super::error::ConverterError;
use super::formats::{self, FormatSpec};
use super::presets::QualityPresetTable;
use super::runner::ProcessRunner;
use super::types::{CodecParameters, ConversionOutcome, ConversionRequest, SizeBudget};
use crate::config::Config;
use crate::media::{FfprobeProber, FileClassifier, FileDescriptor, MediaKind};
use crate::metrics;
use crate::storage::{ScratchSpace, StorageError};

/// Everything decided about a request before the transcoder runs.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    pub descriptor: FileDescriptor,
    pub route: Route,
    pub format: &'static FormatSpec,
    /// Preset values with overrides applied.
    pub params: CodecParameters,
}

/// What a successful pipeline run produced.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Produced {
    pub size_bytes: u64,
    pub attempts: usize,
}

/// Entry point for conversions.
///
/// Classifies the input once, picks a route, and runs the pipeline inside a
/// wrapper that turns every error into a [`ConversionOutcome`] and removes the
/// output path on any failure.
pub struct ConverterDispatcher {
    config: Arc<Config>,
    classifier: FileClassifier,
    builder: CommandBuilder,
    runner: Arc<dyn ProcessRunner>,
}

impl ConverterDispatcher {
    /// Creates a dispatcher probing inputs with the configured ffprobe.
    pub fn new(config: Arc<Config>, runner: Arc<dyn ProcessRunner>) -> Self {
        let working_dir = config.storage.working_dir.clone();
        let prober = FfprobeProber::new(
            config.converter.ffprobe_path.clone(),
            Duration::from_secs(config.converter.probe_timeout_secs),
            working_dir.clone(),
            Arc::clone(&runner),
        );
        let builder = CommandBuilder::new(Arc::new(config.converter.clone()), working_dir);

        Self {
            config,
            classifier: FileClassifier::with_prober(Arc::new(prober)),
            builder,
            runner,
        }
    }

    /// Replaces the classifier.
    pub fn with_classifier(mut self, classifier: FileClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Converts according to `request`.
    pub async fn convert(&self, request: ConversionRequest) -> ConversionOutcome {
        let started = Instant::now();
        let mut kind = MediaKind::Unknown;
        let result = async {
            let prepared = self.prepare(&request).await?;
            kind = prepared.descriptor.kind;
            let size_bytes = self.attempt(&prepared, &request, &prepared.params).await?;
            Ok::<_, ConverterError>((
                prepared.descriptor,
                Produced {
                    size_bytes,
                    attempts: 1,
                },
            ))
        }
        .await;
        self.finish(&request, kind, started, result).await
    }

    /// Converts while searching the quality ladder for an output within `budget`.
    pub async fn compress(
        &self,
        request: ConversionRequest,
        budget: SizeBudget,
    ) -> ConversionOutcome {
        let started = Instant::now();
        let mut kind = MediaKind::Unknown;
        let result = async {
            let prepared = self.prepare(&request).await?;
            kind = prepared.descriptor.kind;
            let produced = SizeTargetingCompressor::new(self, &self.config.compression)
                .run(&prepared, &request, budget)
                .await?;
            Ok::<_, ConverterError>((prepared.descriptor, produced))
        }
        .await;
        self.finish(&request, kind, started, result).await
    }

    /// Copies the input into the incoming area, converts the copy, then
    /// releases it whatever the outcome. The caller's file is only read.
    ///
    /// With a budget the copy goes through the size ladder, as in [`compress`].
    ///
    /// [`compress`]: Self::compress
    pub async fn convert_staged(
        &self,
        scratch: &ScratchSpace,
        request: ConversionRequest,
        budget: Option<SizeBudget>,
    ) -> ConversionOutcome {
        let staged = match scratch.stage_input(&request.input_path).await {
            Ok(path) => path,
            Err(e) => {
                let error = staging_error(&request.input_path, e);
                return self
                    .finish(&request, MediaKind::Unknown, Instant::now(), Err(error))
                    .await;
            }
        };

        let mut staged_request = request;
        staged_request.input_path = staged.clone();
        let outcome = match budget {
            Some(budget) => self.compress(staged_request, budget).await,
            None => self.convert(staged_request).await,
        };

        if let Err(e) = scratch.release_input(&staged).await {
            warn!("Failed to release staged input {}: {}", staged.display(), e);
        }
        outcome
    }

    /// Validates the request and resolves everything needed to build commands.
    ///
    /// The format allow-list is checked before the input is probed, so an
    /// unsupported target never starts an external process.
    pub async fn prepare(
        &self,
        request: &ConversionRequest,
    ) -> Result<PreparedConversion, ConverterError> {
        cleanup::validate_input(&request.input_path).await?;

        let mut descriptor = self.classifier.describe(&request.input_path).await?;
        let route = Route::select(descriptor.kind, request)?;
        let format = formats::require(route.output_kind(), &request.target_format)?;

        cleanup::prepare_output(&request.output_path).await?;
        self.classifier.enrich(&mut descriptor).await;

        let params = QualityPresetTable::resolve(
            route.output_kind(),
            format.name,
            request.preset,
            &request.overrides,
        );

        debug!(
            "Prepared {} -> {} via {} route ({:?})",
            request.input_path.display(),
            format.name,
            route.as_str(),
            params
        );

        Ok(PreparedConversion {
            descriptor,
            route,
            format,
            params,
        })
    }

    /// Runs one transcoder invocation and returns the output size.
    pub(crate) async fn attempt(
        &self,
        prepared: &PreparedConversion,
        request: &ConversionRequest,
        params: &CodecParameters,
    ) -> Result<u64, ConverterError> {
        let invocation = self.builder.build(prepared.route, request, params)?;
        let timeout = Duration::from_secs(self.config.converter.timeout_secs);

        self.runner
            .run(&invocation, timeout)
            .await
            .into_result(&invocation, timeout)?;

        match tokio::fs::metadata(&request.output_path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConverterError::ExternalToolFailed {
                    exit_code: Some(0),
                    stderr: "tool reported success but wrote no output".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Translates the pipeline result into an outcome. On failure the output
    /// path is removed here, once, whatever the cause.
    async fn finish(
        &self,
        request: &ConversionRequest,
        kind: MediaKind,
        started: Instant,
        result: Result<(FileDescriptor, Produced), ConverterError>,
    ) -> ConversionOutcome {
        let elapsed = started.elapsed();
        let kind_label = kind.as_str();
        metrics::CONVERSION_DURATION
            .with_label_values(&[kind_label])
            .observe(elapsed.as_secs_f64());

        match result {
            Ok((descriptor, produced)) => {
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[kind_label, "success"])
                    .inc();
                log_conversion_stats(&descriptor, &request.output_path, produced, elapsed);

                ConversionOutcome::Success {
                    output_path: request.output_path.clone(),
                    output_size_bytes: produced.size_bytes,
                    elapsed_ms: elapsed.as_millis() as u64,
                    attempts: produced.attempts,
                }
            }
            Err(e) => {
                if let Err(cleanup_err) = cleanup::discard_output(&request.output_path).await {
                    warn!(
                        "Failed to remove output {} after error: {}",
                        request.output_path.display(),
                        cleanup_err
                    );
                }
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[kind_label, e.kind().as_str()])
                    .inc();
                warn!(
                    "Conversion of {} failed ({}): {}",
                    request.input_path.display(),
                    e.kind(),
                    e
                );
                ConversionOutcome::failure(&e)
            }
        }
    }
}

/// Staging only reads `source`, so failures on it are input errors. Anything
/// else went wrong inside the incoming area.
fn staging_error(source: &Path, error: StorageError) -> ConverterError {
    match error {
        StorageError::Io { path, source: io } if path == source => match io.kind() {
            std::io::ErrorKind::NotFound => ConverterError::InputNotFound { path },
            _ => ConverterError::InputUnreadable {
                path,
                reason: io.to_string(),
            },
        },
        StorageError::NotAFile { path } => ConverterError::InputUnreadable {
            path,
            reason: "not a regular file".to_string(),
        },
        StorageError::Io { source: io, .. } => ConverterError::Io(io),
        other => ConverterError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

fn log_conversion_stats(
    descriptor: &FileDescriptor,
    output_path: &Path,
    produced: Produced,
    elapsed: Duration,
) {
    let ratio = if descriptor.size_bytes > 0 {
        produced.size_bytes as f64 / descriptor.size_bytes as f64
    } else {
        0.0
    };
    info!(
        input = %descriptor.path.display(),
        output = %output_path.display(),
        kind = %descriptor.kind,
        duration_secs = ?descriptor.duration_secs,
        input_bytes = descriptor.size_bytes,
        output_bytes = produced.size_bytes,
        attempts = produced.attempts,
        elapsed_ms = elapsed.as_millis() as u64,
        "Conversion complete ({:.1}% of input size)",
        ratio * 100.0
    );
}
