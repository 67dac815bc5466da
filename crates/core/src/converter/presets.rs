//! Quality preset resolution.

use super::formats::{self, ParameterFamily};
use super::types::{CodecParameters, QualityPreset};
use crate::media::{normalize_extension, MediaKind};

/// Sample rate applied to lossy audio unless overridden.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;
/// Channel count applied to lossy audio unless overridden.
pub const DEFAULT_CHANNELS: u32 = 2;

/// Knob values per format as `[low, medium, high]`.
const TIERS: &[(&str, [u32; 3])] = &[
    ("mp3", [128, 192, 320]),
    ("aac", [128, 192, 320]),
    ("ogg", [128, 192, 320]),
    ("m4a", [128, 192, 320]),
    ("mp4", [23, 20, 18]),
    ("avi", [23, 20, 18]),
    ("mov", [23, 20, 18]),
    ("mkv", [23, 20, 18]),
    ("webm", [36, 33, 30]),
    ("jpg", [25, 15, 5]),
    ("jpeg", [25, 15, 5]),
    ("webp", [30, 60, 90]),
];

/// Static mapping from quality presets to codec parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityPresetTable;

impl QualityPresetTable {
    /// `[low, medium, high]` knob values for a format, if it has a knob.
    pub fn tiers(format: &str) -> Option<[u32; 3]> {
        let format = normalize_extension(format);
        TIERS
            .iter()
            .find(|(name, _)| *name == format)
            .map(|(_, tiers)| *tiers)
    }

    /// Resolves the parameters for `(kind, format)` at `preset`, then overlays
    /// `overrides` field by field.
    ///
    /// Formats without a quality knob get no preset values, and overrides in a
    /// quality family are dropped for them. An unknown `(kind, format)` pair
    /// resolves to the overrides alone; rejecting it is the builder's job.
    pub fn resolve(
        kind: MediaKind,
        format: &str,
        preset: QualityPreset,
        overrides: &CodecParameters,
    ) -> CodecParameters {
        let Some(spec) = formats::lookup(kind, format) else {
            return overrides.clone();
        };

        let Some(knob) = spec.knob else {
            return CodecParameters {
                bitrate_kbps: None,
                crf: None,
                qscale: None,
                ..overrides.clone()
            };
        };

        let mut defaults = CodecParameters::default();
        if let Some(tiers) = Self::tiers(spec.name) {
            defaults.set_knob(knob.family, tiers[preset.tier_index()]);
        }
        if kind == MediaKind::Audio {
            defaults.sampling_rate_hz = Some(DEFAULT_SAMPLE_RATE_HZ);
            defaults.channel_count = Some(DEFAULT_CHANNELS);
        }

        defaults.overlay(overrides)
    }
}

impl CodecParameters {
    /// Value of the field backing `family`.
    pub fn knob(&self, family: ParameterFamily) -> Option<u32> {
        match family {
            ParameterFamily::BitrateKbps => self.bitrate_kbps,
            ParameterFamily::Crf => self.crf,
            ParameterFamily::Qscale => self.qscale,
        }
    }

    /// Sets the field backing `family`.
    pub fn set_knob(&mut self, family: ParameterFamily, value: u32) {
        match family {
            ParameterFamily::BitrateKbps => self.bitrate_kbps = Some(value),
            ParameterFamily::Crf => self.crf = Some(value),
            ParameterFamily::Qscale => self.qscale = Some(value),
        }
    }
}
