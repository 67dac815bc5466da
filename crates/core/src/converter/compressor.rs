//! Size-targeted compression.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::cleanup;
use super::dispatcher::{ConverterDispatcher, PreparedConversion, Produced};
use super::error::ConverterError;
use super::formats::{FormatSpec, ParameterFamily};
use super::types::{CodecParameters, ConversionRequest, SizeBudget};
use crate::config::CompressionConfig;
use crate::metrics;

/// Ordered parameter values to try, highest quality first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    /// Knob the steps drive; `None` drives `compression_level`.
    pub family: Option<ParameterFamily>,
    pub steps: Vec<u32>,
}

impl Ladder {
    /// Ladder configured for `format`, if any.
    pub fn for_format(format: &FormatSpec, config: &CompressionConfig) -> Option<Self> {
        let steps = config.ladder_for(format.name)?;
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            family: format.knob.map(|k| k.family),
            steps: steps.to_vec(),
        })
    }

    /// `base` with one step applied.
    pub fn apply(&self, base: &CodecParameters, step: u32) -> CodecParameters {
        let mut params = base.clone();
        match self.family {
            Some(family) => params.set_knob(family, step),
            None => params.compression_level = Some(step),
        }
        params
    }
}

/// Sibling path where the smallest oversized attempt is kept:
/// `photo.jpg` becomes `photo.best-effort.jpg`.
pub fn best_effort_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}.best-effort.{}", stem, ext.to_string_lossy()),
        None => format!("{}.best-effort", stem),
    };
    output.with_file_name(name)
}

/// Walks the ladder until an output fits the budget.
///
/// Each attempt writes to the request's output path. An oversized attempt is
/// moved to the best-effort path if it is the smallest so far and deleted
/// otherwise, so at most one rejected file exists at any time. Failed attempts
/// are deleted and the search continues, except when the tool is missing.
/// Anything that ends the search early removes the best-effort file as well.
pub(crate) struct SizeTargetingCompressor<'a> {
    dispatcher: &'a ConverterDispatcher,
    config: &'a CompressionConfig,
}

impl<'a> SizeTargetingCompressor<'a> {
    pub(crate) fn new(dispatcher: &'a ConverterDispatcher, config: &'a CompressionConfig) -> Self {
        Self { dispatcher, config }
    }

    pub(crate) async fn run(
        &self,
        prepared: &PreparedConversion,
        request: &ConversionRequest,
        budget: SizeBudget,
    ) -> Result<Produced, ConverterError> {
        let ladder = Ladder::for_format(prepared.format, self.config);
        let candidates: Vec<CodecParameters> = match &ladder {
            Some(ladder) => ladder
                .steps
                .iter()
                .map(|step| ladder.apply(&prepared.params, *step))
                .collect(),
            None => {
                debug!(
                    "No ladder for {}, single attempt at preset quality",
                    prepared.format.name
                );
                vec![prepared.params.clone()]
            }
        };

        let output = &request.output_path;
        let best_effort = best_effort_path(output);
        let mut smallest: Option<u64> = None;
        let mut last_error: Option<ConverterError> = None;
        let mut attempts = 0;

        for params in &candidates {
            attempts += 1;
            match self.dispatcher.attempt(prepared, request, params).await {
                Ok(size) if budget.allows(size) => {
                    metrics::COMPRESSION_ATTEMPTS.observe(attempts as f64);
                    discard_quietly(&best_effort).await;
                    info!(
                        "Met budget of {} bytes with {} bytes on attempt {}/{}",
                        budget.as_bytes(),
                        size,
                        attempts,
                        candidates.len()
                    );
                    return Ok(Produced {
                        size_bytes: size,
                        attempts,
                    });
                }
                Ok(size) => {
                    debug!(
                        "Attempt {} produced {} bytes, over budget of {}",
                        attempts,
                        size,
                        budget.as_bytes()
                    );
                    let set_aside = if smallest.is_none_or(|s| size < s) {
                        match tokio::fs::rename(output, &best_effort).await {
                            Ok(()) => {
                                smallest = Some(size);
                                Ok(())
                            }
                            Err(e) => Err(ConverterError::from(e)),
                        }
                    } else {
                        cleanup::discard_output(output).await.map(|_| ())
                    };
                    if let Err(e) = set_aside {
                        return Err(abandon(&best_effort, attempts, e).await);
                    }
                }
                Err(e @ ConverterError::ExternalToolUnavailable { .. }) => {
                    return Err(abandon(&best_effort, attempts, e).await);
                }
                Err(e) => {
                    warn!("Compression attempt {} failed: {}", attempts, e);
                    if let Err(cleanup_err) = cleanup::discard_output(output).await {
                        return Err(abandon(&best_effort, attempts, cleanup_err).await);
                    }
                    last_error = Some(e);
                }
            }
        }

        metrics::COMPRESSION_ATTEMPTS.observe(attempts as f64);

        let Some(smallest) = smallest else {
            // Nothing was produced at all; report why.
            return Err(last_error.unwrap_or_else(|| {
                ConverterError::invalid_request(format!(
                    "no compression attempts configured for {}",
                    prepared.format.name
                ))
            }));
        };

        let best_effort_path = if self.config.keep_best_effort {
            Some(best_effort)
        } else {
            discard_quietly(&best_effort).await;
            None
        };

        Err(ConverterError::SizeTargetUnreachable {
            budget_bytes: budget.as_bytes(),
            attempts,
            smallest_size_bytes: Some(smallest),
            best_effort_path,
        })
    }
}

/// Ends the search early: the best effort so far is not reported, so it is
/// removed too.
async fn abandon(best_effort: &Path, attempts: usize, error: ConverterError) -> ConverterError {
    metrics::COMPRESSION_ATTEMPTS.observe(attempts as f64);
    discard_quietly(best_effort).await;
    error
}

async fn discard_quietly(path: &Path) {
    if let Err(e) = cleanup::discard_output(path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
