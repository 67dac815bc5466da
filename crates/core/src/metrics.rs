//! Prometheus metrics for the conversion pipeline.
//!
//! This module provides metrics for:
//! - Conversions (outcomes, duration)
//! - Size targeting (attempts per search)
//! - Cleanup (partial outputs removed)
//! - External tools (invocations by status)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Registry holding every metric in [`all_metrics`].
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions by input kind and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaconv_conversions_total", "Total conversion calls"),
        &["kind", "result"], // result: "success" or an error kind
    )
    .expect("valid conversions_total metric")
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediaconv_conversion_duration_seconds",
            "Duration of a conversion call",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["kind"],
    )
    .expect("valid conversion_duration metric")
});

// =============================================================================
// Size Targeting Metrics
// =============================================================================

/// Transcoder attempts per size-targeted compression.
pub static COMPRESSION_ATTEMPTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "mediaconv_compression_attempts",
            "Ladder steps tried per size-targeted compression",
        )
        .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0]),
    )
    .expect("valid compression_attempts metric")
});

// =============================================================================
// Cleanup and External Tool Metrics
// =============================================================================

/// Partial or oversized outputs deleted.
pub static PARTIAL_OUTPUTS_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediaconv_partial_outputs_removed_total",
        "Partial or rejected output files removed",
    )
    .expect("valid partial_outputs_removed metric")
});

/// External process runs by tool and status.
pub static EXTERNAL_TOOL_INVOCATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediaconv_external_tool_invocations_total",
            "External tool invocations",
        ),
        &["tool", "status"], // status: "success", "failed", "timeout", "unavailable"
    )
    .expect("valid external_tool_invocations metric")
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(COMPRESSION_ATTEMPTS.clone()),
        Box::new(PARTIAL_OUTPUTS_REMOVED.clone()),
        Box::new(EXTERNAL_TOOL_INVOCATIONS.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
