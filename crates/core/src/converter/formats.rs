//! Per-kind output format tables.
//!
//! Everything that differs between audio, video and image command lines is
//! data in these tables; the command builder itself is shared.

use serde::{Deserialize, Serialize};

use super::error::ConverterError;
use crate::media::{normalize_extension, MediaKind};

/// Which codec parameter a format's quality knob is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterFamily {
    BitrateKbps,
    Crf,
    Qscale,
}

/// The single quality control a format exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityKnob {
    pub family: ParameterFamily,
    /// Tool flag carrying the value.
    pub flag: &'static str,
    /// Whether a larger value means better quality.
    pub higher_is_better: bool,
}

impl QualityKnob {
    /// Renders a knob value as a tool argument.
    pub fn render(&self, value: u32) -> String {
        match self.family {
            ParameterFamily::BitrateKbps => format!("{}k", value),
            ParameterFamily::Crf | ParameterFamily::Qscale => value.to_string(),
        }
    }
}

/// One supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub name: &'static str,
    pub kind: MediaKind,
    /// Encoder to select; `None` lets the tool pick from the extension.
    pub encoder: Option<&'static str>,
    pub knob: Option<QualityKnob>,
    /// Arguments always emitted after the encoder.
    pub fixed_args: &'static [&'static str],
}

impl FormatSpec {
    /// A format without a quality knob gets no preset parameters.
    pub fn is_lossless(&self) -> bool {
        self.knob.is_none()
    }

    /// Codec selection flag for this format's stream.
    pub fn codec_flag(&self) -> &'static str {
        match self.kind {
            MediaKind::Audio => "-c:a",
            _ => "-c:v",
        }
    }
}

const BITRATE: QualityKnob = QualityKnob {
    family: ParameterFamily::BitrateKbps,
    flag: "-b:a",
    higher_is_better: true,
};

const CRF: QualityKnob = QualityKnob {
    family: ParameterFamily::Crf,
    flag: "-crf",
    higher_is_better: false,
};

const JPEG_QSCALE: QualityKnob = QualityKnob {
    family: ParameterFamily::Qscale,
    flag: "-q:v",
    higher_is_better: false,
};

const WEBP_QUALITY: QualityKnob = QualityKnob {
    family: ParameterFamily::Qscale,
    flag: "-quality",
    higher_is_better: true,
};

const X264_ARGS: &[&str] = &["-preset", "medium"];

const fn audio(name: &'static str, encoder: &'static str, knob: Option<QualityKnob>) -> FormatSpec {
    FormatSpec {
        name,
        kind: MediaKind::Audio,
        encoder: Some(encoder),
        knob,
        fixed_args: &[],
    }
}

const fn video(
    name: &'static str,
    encoder: &'static str,
    fixed_args: &'static [&'static str],
) -> FormatSpec {
    FormatSpec {
        name,
        kind: MediaKind::Video,
        encoder: Some(encoder),
        knob: Some(CRF),
        fixed_args,
    }
}

const fn image(
    name: &'static str,
    encoder: Option<&'static str>,
    knob: Option<QualityKnob>,
) -> FormatSpec {
    FormatSpec {
        name,
        kind: MediaKind::Image,
        encoder,
        knob,
        fixed_args: &[],
    }
}

static AUDIO_FORMATS: &[FormatSpec] = &[
    audio("mp3", "libmp3lame", Some(BITRATE)),
    audio("wav", "pcm_s16le", None),
    audio("flac", "flac", None),
    audio("aac", "aac", Some(BITRATE)),
    audio("ogg", "libvorbis", Some(BITRATE)),
    audio("m4a", "aac", Some(BITRATE)),
];

static VIDEO_FORMATS: &[FormatSpec] = &[
    video("mp4", "libx264", X264_ARGS),
    video("avi", "libx264", X264_ARGS),
    video("mov", "libx264", X264_ARGS),
    // VP9 only honours -crf as constant quality when the bitrate is zeroed.
    video("webm", "libvpx-vp9", &["-b:v", "0"]),
    video("mkv", "libx264", X264_ARGS),
];

static IMAGE_FORMATS: &[FormatSpec] = &[
    image("jpg", None, Some(JPEG_QSCALE)),
    image("jpeg", None, Some(JPEG_QSCALE)),
    image("png", None, None),
    image("webp", Some("libwebp"), Some(WEBP_QUALITY)),
    image("gif", None, None),
    image("bmp", None, None),
];

/// Output formats for a kind.
pub fn formats_for(kind: MediaKind) -> &'static [FormatSpec] {
    match kind {
        MediaKind::Audio => AUDIO_FORMATS,
        MediaKind::Video => VIDEO_FORMATS,
        MediaKind::Image => IMAGE_FORMATS,
        MediaKind::Unknown => &[],
    }
}

/// Output format names accepted for a kind.
pub fn supported_outputs(kind: MediaKind) -> Vec<&'static str> {
    formats_for(kind).iter().map(|f| f.name).collect()
}

/// Finds a format in a kind's allow-list.
pub fn lookup(kind: MediaKind, format: &str) -> Option<&'static FormatSpec> {
    let format = normalize_extension(format);
    formats_for(kind).iter().find(|f| f.name == format)
}

/// Like [`lookup`], but reports a missing entry as `UnsupportedFormat`.
pub fn require(kind: MediaKind, format: &str) -> Result<&'static FormatSpec, ConverterError> {
    lookup(kind, format)
        .ok_or_else(|| ConverterError::unsupported_format(kind, normalize_extension(format)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_lists() {
        assert_eq!(
            supported_outputs(MediaKind::Audio),
            vec!["mp3", "wav", "flac", "aac", "ogg", "m4a"]
        );
        assert_eq!(
            supported_outputs(MediaKind::Video),
            vec!["mp4", "avi", "mov", "webm", "mkv"]
        );
        assert_eq!(
            supported_outputs(MediaKind::Image),
            vec!["jpg", "jpeg", "png", "webp", "gif", "bmp"]
        );
        assert!(supported_outputs(MediaKind::Unknown).is_empty());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let spec = lookup(MediaKind::Audio, ".MP3").unwrap();
        assert_eq!(spec.encoder, Some("libmp3lame"));
        assert!(lookup(MediaKind::Video, "mp3").is_none());
    }

    #[test]
    fn test_require_rejects_with_kind() {
        let err = require(MediaKind::Image, "tiff").unwrap_err();
        match err {
            ConverterError::UnsupportedFormat { kind, format } => {
                assert_eq!(kind, "image");
                assert_eq!(format, "tiff");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_table_entries_match_their_kind() {
        for kind in [MediaKind::Audio, MediaKind::Video, MediaKind::Image] {
            for spec in formats_for(kind) {
                assert_eq!(spec.kind, kind, "{} is filed under the wrong kind", spec.name);
            }
        }
    }

    #[test]
    fn test_knobs() {
        assert!(lookup(MediaKind::Audio, "flac").unwrap().is_lossless());
        assert!(lookup(MediaKind::Image, "png").unwrap().is_lossless());

        let webm = lookup(MediaKind::Video, "webm").unwrap();
        assert_eq!(webm.knob.unwrap().family, ParameterFamily::Crf);
        assert_eq!(webm.fixed_args, &["-b:v", "0"]);

        assert_eq!(BITRATE.render(320), "320k");
        assert_eq!(JPEG_QSCALE.render(5), "5");
    }
}
