//! Transcoder command construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::ConverterError;
use super::formats::{self, FormatSpec};
use super::presets::QualityPresetTable;
use super::types::{
    AudioOptions, CodecParameters, ConversionRequest, Dimensions, ExternalInvocation,
    FrameCapture, ImageOperation, ResizeSpec, VideoOptions,
};
use crate::config::ConverterConfig;
use crate::media::MediaKind;

/// Build path chosen for a request.
///
/// Decided once per request from the classified kind; everything downstream
/// takes the route instead of looking at the input again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Audio,
    Video,
    Image,
    /// Audio track of a video input, video stream suppressed.
    ExtractAudio,
    /// One still frame of a video input, written as an image.
    VideoFrame,
}

impl Route {
    /// Chooses the route for `request` given the input's kind.
    pub fn select(kind: MediaKind, request: &ConversionRequest) -> Result<Self, ConverterError> {
        if kind == MediaKind::Unknown {
            return Err(ConverterError::UnsupportedInput {
                path: request.input_path.clone(),
            });
        }

        if request.frame.is_some() {
            if kind != MediaKind::Video {
                return Err(ConverterError::invalid_request(format!(
                    "frame capture needs a video input, got {}",
                    kind
                )));
            }
            if request.extract_audio
                || request.image != ImageOperation::default()
                || request.video != VideoOptions::default()
            {
                return Err(ConverterError::invalid_request(
                    "frame capture cannot be combined with other operations",
                ));
            }
        }

        let route = Self::route_for(kind, request)?;
        if request.audio != AudioOptions::default() && route.output_kind() != MediaKind::Audio {
            return Err(ConverterError::invalid_request(format!(
                "audio options do not apply to {} output",
                route.output_kind()
            )));
        }
        Ok(route)
    }

    fn route_for(kind: MediaKind, request: &ConversionRequest) -> Result<Self, ConverterError> {
        if request.frame.is_some() {
            return Ok(Self::VideoFrame);
        }

        if request.extract_audio {
            if kind != MediaKind::Video {
                return Err(ConverterError::invalid_request(format!(
                    "audio extraction needs a video input, got {}",
                    kind
                )));
            }
            return Ok(Self::ExtractAudio);
        }

        if request.image != ImageOperation::default() && kind != MediaKind::Image {
            return Err(ConverterError::invalid_request(format!(
                "image operations do not apply to {} input",
                kind
            )));
        }
        if request.video != VideoOptions::default() && kind != MediaKind::Video {
            return Err(ConverterError::invalid_request(format!(
                "video options do not apply to {} input",
                kind
            )));
        }

        Ok(match kind {
            MediaKind::Audio => Self::Audio,
            MediaKind::Video => Self::Video,
            _ => Self::Image,
        })
    }

    /// Kind of the produced file, which picks the format allow-list.
    pub fn output_kind(&self) -> MediaKind {
        match self {
            Self::Audio | Self::ExtractAudio => MediaKind::Audio,
            Self::Video => MediaKind::Video,
            Self::Image | Self::VideoFrame => MediaKind::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
            Self::ExtractAudio => "extract_audio",
            Self::VideoFrame => "video_frame",
        }
    }
}

/// Turns requests into transcoder invocations.
///
/// One builder covers every kind; per-format differences come from
/// [`formats`]. Output is deterministic for a given request and parameters.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    config: Arc<ConverterConfig>,
    working_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(config: Arc<ConverterConfig>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Builds the invocation for `request` along `route` with resolved `params`.
    pub fn build(
        &self,
        route: Route,
        request: &ConversionRequest,
        params: &CodecParameters,
    ) -> Result<ExternalInvocation, ConverterError> {
        let spec = formats::require(route.output_kind(), &request.target_format)?;

        // The tool runs inside the working dir, so relative paths would resolve there.
        let input = std::path::absolute(&request.input_path)?;
        let output = std::path::absolute(&request.output_path)?;

        let mut invocation = ExternalInvocation::new(&self.config.ffmpeg_path, &self.working_dir);
        invocation.arg("-i").path_arg(&input).arg("-y");

        match route {
            Route::Audio => {
                push_loudness_filter(&mut invocation, &request.audio)?;
                push_codec_args(&mut invocation, spec, params);
            }
            Route::ExtractAudio => {
                invocation.arg("-vn");
                push_loudness_filter(&mut invocation, &request.audio)?;
                push_codec_args(&mut invocation, spec, params);
            }
            Route::VideoFrame => {
                let capture = request.frame.unwrap_or_default();
                push_frame_capture(&mut invocation, &capture)?;
                push_codec_args(&mut invocation, spec, params);
            }
            Route::Video => {
                push_video_filters(&mut invocation, &request.video)?;
                push_codec_args(&mut invocation, spec, params);
                push_video_audio(&mut invocation, request)?;
            }
            Route::Image => {
                if let Some(filter) = self.image_filter(&request.image)? {
                    invocation.arg("-vf").arg(filter);
                }
                push_codec_args(&mut invocation, spec, params);
            }
        }

        invocation
            .arg("-loglevel")
            .arg(self.config.ffmpeg_log_level.clone())
            .args(self.config.extra_ffmpeg_args.iter().cloned())
            .path_arg(&output);

        Ok(invocation)
    }

    fn image_filter(&self, operation: &ImageOperation) -> Result<Option<String>, ConverterError> {
        match operation {
            ImageOperation::Reformat => Ok(None),
            ImageOperation::Resize(spec) => resize_filter(spec).map(Some),
            ImageOperation::Thumbnail { size } => {
                let size = size.unwrap_or(self.config.thumbnail_size);
                if size.width == 0 || size.height == 0 {
                    return Err(ConverterError::invalid_request(format!(
                        "thumbnail size must be non-zero, got {}",
                        size
                    )));
                }
                Ok(Some(thumbnail_filter(size)))
            }
        }
    }
}

/// Encoder, fixed arguments, and whichever parameters are present.
fn push_codec_args(invocation: &mut ExternalInvocation, spec: &FormatSpec, params: &CodecParameters) {
    if let Some(encoder) = spec.encoder {
        invocation.arg(spec.codec_flag()).arg(encoder);
    }
    invocation.args(spec.fixed_args.iter().copied());

    if let Some(knob) = spec.knob {
        if let Some(value) = params.knob(knob.family) {
            invocation.arg(knob.flag).arg(knob.render(value));
        }
    }
    if let Some(level) = params.compression_level {
        invocation.arg("-compression_level").arg(level.to_string());
    }

    if spec.kind == MediaKind::Audio {
        if let Some(rate) = params.sampling_rate_hz {
            invocation.arg("-ar").arg(rate.to_string());
        }
        if let Some(channels) = params.channel_count {
            invocation.arg("-ac").arg(channels.to_string());
        }
    }
}

fn push_video_filters(
    invocation: &mut ExternalInvocation,
    options: &VideoOptions,
) -> Result<(), ConverterError> {
    if let Some(scale) = options.scale {
        if scale.width == 0 || scale.height == 0 {
            return Err(ConverterError::invalid_request(format!(
                "output dimensions must be non-zero, got {}",
                scale
            )));
        }
        let mut filter = format!("scale={}:{}", scale.width, scale.height);
        if options.shrink_to_fit {
            filter.push_str(":force_original_aspect_ratio=decrease");
        }
        invocation.arg("-vf").arg(filter);
    }

    if let Some(fps) = options.fps {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ConverterError::invalid_request(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        invocation.arg("-r").arg(fps.to_string());
    }

    Ok(())
}

/// Single-pass EBU R128 normalization to the requested integrated loudness.
fn push_loudness_filter(
    invocation: &mut ExternalInvocation,
    options: &AudioOptions,
) -> Result<(), ConverterError> {
    let Some(lufs) = options.normalize_lufs else {
        return Ok(());
    };
    if !(lufs.is_finite() && (-70.0..=-5.0).contains(&lufs)) {
        return Err(ConverterError::invalid_request(format!(
            "loudness target must be between -70 and -5 LUFS, got {}",
            lufs
        )));
    }
    invocation
        .arg("-af")
        .arg(format!("loudnorm=I={}:TP=-1.5:LRA=11", lufs));
    Ok(())
}

/// Seeks after decoding starts so the frame is exact, then keeps one frame.
fn push_frame_capture(
    invocation: &mut ExternalInvocation,
    capture: &FrameCapture,
) -> Result<(), ConverterError> {
    if !(capture.at_secs.is_finite() && capture.at_secs >= 0.0) {
        return Err(ConverterError::invalid_request(format!(
            "frame position must be a non-negative number of seconds, got {}",
            capture.at_secs
        )));
    }
    invocation
        .arg("-ss")
        .arg(capture.at_secs.to_string())
        .args(["-vframes", "1"]);

    if let Some(size) = capture.size {
        if size.width == 0 || size.height == 0 {
            return Err(ConverterError::invalid_request(format!(
                "frame size must be non-zero, got {}",
                size
            )));
        }
        invocation
            .arg("-vf")
            .arg(format!("scale={}:{}", size.width, size.height));
    }
    Ok(())
}

/// Copies the audio stream unless a re-encode format was requested.
fn push_video_audio(
    invocation: &mut ExternalInvocation,
    request: &ConversionRequest,
) -> Result<(), ConverterError> {
    let Some(audio_format) = &request.video.audio_format else {
        invocation.args(["-c:a", "copy"]);
        return Ok(());
    };

    let audio = formats::require(MediaKind::Audio, audio_format)?;
    if let Some(encoder) = audio.encoder {
        invocation.arg("-c:a").arg(encoder);
    }
    let params = QualityPresetTable::resolve(
        MediaKind::Audio,
        audio.name,
        request.preset,
        &CodecParameters::default(),
    );
    if let (Some(knob), Some(value)) = (audio.knob, params.bitrate_kbps) {
        invocation.arg(knob.flag).arg(knob.render(value));
    }
    Ok(())
}

fn resize_filter(spec: &ResizeSpec) -> Result<String, ConverterError> {
    if spec.width.is_none() && spec.height.is_none() {
        return Err(ConverterError::invalid_request(
            "resize needs a width, a height, or both",
        ));
    }
    if spec.width == Some(0) || spec.height == Some(0) {
        return Err(ConverterError::invalid_request("resize dimensions must be non-zero"));
    }

    let side = |v: Option<u32>| v.map(|v| v.to_string()).unwrap_or_else(|| "-1".to_string());
    let mut filter = format!("scale={}:{}", side(spec.width), side(spec.height));
    if spec.preserve_aspect && spec.width.is_some() && spec.height.is_some() {
        filter.push_str(":force_original_aspect_ratio=decrease");
    }
    Ok(filter)
}

fn thumbnail_filter(size: Dimensions) -> String {
    let (w, h) = (size.width, size.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:white"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::QualityPreset;

    fn builder() -> CommandBuilder {
        CommandBuilder::new(Arc::new(ConverterConfig::default()), "/scratch/temp")
    }

    fn resolve(route: Route, request: &ConversionRequest) -> CodecParameters {
        QualityPresetTable::resolve(
            route.output_kind(),
            &request.target_format,
            request.preset,
            &request.overrides,
        )
    }

    fn build(kind: MediaKind, request: &ConversionRequest) -> Result<ExternalInvocation, ConverterError> {
        let route = Route::select(kind, request)?;
        builder().build(route, request, &resolve(route, request))
    }

    #[test]
    fn test_audio_mp3_high() {
        let request =
            ConversionRequest::new("/in/sample.wav", "/out/sample.mp3", "mp3").with_preset("high");
        let inv = build(MediaKind::Audio, &request).unwrap();

        assert_eq!(inv.program, PathBuf::from("ffmpeg"));
        assert_eq!(&inv.args[..3], &["-i", "/in/sample.wav", "-y"]);
        assert_eq!(inv.value_of("-c:a"), Some("libmp3lame"));
        assert_eq!(inv.value_of("-b:a"), Some("320k"));
        assert_eq!(inv.value_of("-ar"), Some("44100"));
        assert_eq!(inv.value_of("-ac"), Some("2"));
        assert_eq!(inv.value_of("-loglevel"), Some("error"));
        assert_eq!(inv.last_arg(), Some("/out/sample.mp3"));
        assert_eq!(inv.working_dir, PathBuf::from("/scratch/temp"));
    }

    #[test]
    fn test_lossless_audio_omits_quality_flags() {
        let request = ConversionRequest::new("/in/a.mp3", "/out/a.flac", "flac");
        let inv = build(MediaKind::Audio, &request).unwrap();
        assert_eq!(inv.value_of("-c:a"), Some("flac"));
        assert!(!inv.has_arg("-b:a"));
        assert!(!inv.has_arg("-ar"));
    }

    #[test]
    fn test_extract_audio_suppresses_video() {
        let request = ConversionRequest::new("/in/clip.mp4", "/out/clip.flac", "flac").extracting_audio();
        let route = Route::select(MediaKind::Video, &request).unwrap();
        assert_eq!(route, Route::ExtractAudio);

        let inv = builder().build(route, &request, &resolve(route, &request)).unwrap();
        assert!(inv.has_arg("-vn"));
        assert_eq!(inv.value_of("-c:a"), Some("flac"));
        assert!(!inv.has_arg("-c:v"));
    }

    #[test]
    fn test_extract_audio_needs_video() {
        let request = ConversionRequest::new("/in/a.wav", "/out/a.mp3", "mp3").extracting_audio();
        let err = Route::select(MediaKind::Audio, &request).unwrap_err();
        assert!(matches!(err, ConverterError::InvalidRequest { .. }));
    }

    #[test]
    fn test_video_copies_audio_by_default() {
        let request = ConversionRequest::new("/in/clip.avi", "/out/clip.mp4", "mp4");
        let inv = build(MediaKind::Video, &request).unwrap();
        assert_eq!(inv.value_of("-c:v"), Some("libx264"));
        assert_eq!(inv.value_of("-preset"), Some("medium"));
        assert_eq!(inv.value_of("-crf"), Some("20"));
        assert_eq!(inv.value_of("-c:a"), Some("copy"));
    }

    #[test]
    fn test_video_audio_reencode_and_filters() {
        let request = ConversionRequest::new("/in/clip.mov", "/out/clip.webm", "webm")
            .with_preset(QualityPreset::Low)
            .with_video_options(VideoOptions {
                scale: Some(Dimensions::new(1280, 720)),
                shrink_to_fit: true,
                fps: Some(30.0),
                audio_format: Some("ogg".to_string()),
            });
        let inv = build(MediaKind::Video, &request).unwrap();
        assert_eq!(
            inv.value_of("-vf"),
            Some("scale=1280:720:force_original_aspect_ratio=decrease")
        );
        assert_eq!(inv.value_of("-r"), Some("30"));
        assert_eq!(inv.value_of("-c:v"), Some("libvpx-vp9"));
        assert_eq!(inv.value_of("-b:v"), Some("0"));
        assert_eq!(inv.value_of("-crf"), Some("36"));
        assert_eq!(inv.value_of("-c:a"), Some("libvorbis"));
        assert_eq!(inv.value_of("-b:a"), Some("128k"));
    }

    #[test]
    fn test_video_rejects_unknown_audio_format() {
        let request = ConversionRequest::new("/in/clip.mov", "/out/clip.mp4", "mp4")
            .with_video_options(VideoOptions {
                audio_format: Some("opus".to_string()),
                ..Default::default()
            });
        let err = build(MediaKind::Video, &request).unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_image_reformat_and_quality() {
        let request =
            ConversionRequest::new("/in/photo.png", "/out/photo.jpg", "jpg").with_preset("high");
        let inv = build(MediaKind::Image, &request).unwrap();
        assert!(!inv.has_arg("-vf"));
        assert!(!inv.has_arg("-c:v"));
        assert_eq!(inv.value_of("-q:v"), Some("5"));

        let request = ConversionRequest::new("/in/photo.png", "/out/photo.webp", "webp");
        let inv = build(MediaKind::Image, &request).unwrap();
        assert_eq!(inv.value_of("-c:v"), Some("libwebp"));
        assert_eq!(inv.value_of("-quality"), Some("60"));
    }

    #[test]
    fn test_image_resize_filters() {
        let request = ConversionRequest::new("/in/p.jpg", "/out/p.png", "png").with_image_operation(
            ImageOperation::Resize(ResizeSpec {
                width: Some(800),
                height: None,
                preserve_aspect: true,
            }),
        );
        let inv = build(MediaKind::Image, &request).unwrap();
        assert_eq!(inv.value_of("-vf"), Some("scale=800:-1"));

        let request = ConversionRequest::new("/in/p.jpg", "/out/p.png", "png").with_image_operation(
            ImageOperation::Resize(ResizeSpec {
                width: Some(800),
                height: Some(600),
                preserve_aspect: true,
            }),
        );
        let inv = build(MediaKind::Image, &request).unwrap();
        assert_eq!(
            inv.value_of("-vf"),
            Some("scale=800:600:force_original_aspect_ratio=decrease")
        );

        let request = ConversionRequest::new("/in/p.jpg", "/out/p.png", "png").with_image_operation(
            ImageOperation::Resize(ResizeSpec {
                width: None,
                height: None,
                preserve_aspect: false,
            }),
        );
        assert!(matches!(
            build(MediaKind::Image, &request),
            Err(ConverterError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_thumbnail_uses_configured_default() {
        let request = ConversionRequest::new("/in/p.bmp", "/out/p.png", "png")
            .with_image_operation(ImageOperation::Thumbnail { size: None });
        let inv = build(MediaKind::Image, &request).unwrap();
        assert_eq!(
            inv.value_of("-vf"),
            Some("scale=150:150:force_original_aspect_ratio=decrease,pad=150:150:(ow-iw)/2:(oh-ih)/2:white")
        );
    }

    #[test]
    fn test_image_ops_rejected_for_audio() {
        let request = ConversionRequest::new("/in/a.wav", "/out/a.mp3", "mp3")
            .with_image_operation(ImageOperation::Thumbnail { size: None });
        assert!(matches!(
            Route::select(MediaKind::Audio, &request),
            Err(ConverterError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let request = ConversionRequest::new("/in/notes.txt", "/out/notes.mp3", "mp3");
        let err = Route::select(MediaKind::Unknown, &request).unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedInput { .. }));
    }

    #[test]
    fn test_loudness_normalization() {
        let request = ConversionRequest::new("/in/voice.wav", "/out/voice.mp3", "mp3")
            .normalizing_loudness(-16.0);
        let inv = build(MediaKind::Audio, &request).unwrap();
        assert_eq!(inv.value_of("-af"), Some("loudnorm=I=-16:TP=-1.5:LRA=11"));
        assert_eq!(inv.value_of("-c:a"), Some("libmp3lame"));

        let request = ConversionRequest::new("/in/clip.mp4", "/out/clip.wav", "wav")
            .extracting_audio()
            .normalizing_loudness(crate::converter::DEFAULT_LOUDNESS_LUFS);
        let inv = build(MediaKind::Video, &request).unwrap();
        assert!(inv.has_arg("-vn"));
        assert_eq!(inv.value_of("-af"), Some("loudnorm=I=-20:TP=-1.5:LRA=11"));

        let plain = ConversionRequest::new("/in/voice.wav", "/out/voice.mp3", "mp3");
        assert!(!build(MediaKind::Audio, &plain).unwrap().has_arg("-af"));
    }

    #[test]
    fn test_loudness_rejected_out_of_range_or_for_video() {
        let request = ConversionRequest::new("/in/voice.wav", "/out/voice.mp3", "mp3")
            .normalizing_loudness(3.0);
        assert!(matches!(
            build(MediaKind::Audio, &request),
            Err(ConverterError::InvalidRequest { .. })
        ));

        let request = ConversionRequest::new("/in/clip.mov", "/out/clip.mp4", "mp4")
            .normalizing_loudness(-20.0);
        assert!(matches!(
            Route::select(MediaKind::Video, &request),
            Err(ConverterError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_video_frame_capture() {
        let request = ConversionRequest::new("/in/clip.mp4", "/out/poster.jpg", "jpg")
            .with_preset("high")
            .capturing_frame(FrameCapture {
                at_secs: 12.5,
                size: Some(Dimensions::new(320, 240)),
            });
        let route = Route::select(MediaKind::Video, &request).unwrap();
        assert_eq!(route, Route::VideoFrame);
        assert_eq!(route.output_kind(), MediaKind::Image);

        let inv = builder().build(route, &request, &resolve(route, &request)).unwrap();
        assert_eq!(&inv.args[..3], &["-i", "/in/clip.mp4", "-y"]);
        assert_eq!(inv.value_of("-ss"), Some("12.5"));
        assert_eq!(inv.value_of("-vframes"), Some("1"));
        assert_eq!(inv.value_of("-vf"), Some("scale=320:240"));
        assert_eq!(inv.value_of("-q:v"), Some("5"));
        assert!(!inv.has_arg("-c:a"));
        assert_eq!(inv.last_arg(), Some("/out/poster.jpg"));
    }

    #[test]
    fn test_video_frame_defaults_and_rejections() {
        let request = ConversionRequest::new("/in/clip.mkv", "/out/poster.png", "png")
            .capturing_frame(FrameCapture::default());
        let inv = build(MediaKind::Video, &request).unwrap();
        assert_eq!(inv.value_of("-ss"), Some("1"));
        assert!(!inv.has_arg("-vf"));

        let video_target = ConversionRequest::new("/in/clip.mkv", "/out/poster.mp4", "mp4")
            .capturing_frame(FrameCapture::default());
        assert!(matches!(
            build(MediaKind::Video, &video_target),
            Err(ConverterError::UnsupportedFormat { .. })
        ));

        let from_image = ConversionRequest::new("/in/p.png", "/out/p.jpg", "jpg")
            .capturing_frame(FrameCapture::default());
        assert!(matches!(
            Route::select(MediaKind::Image, &from_image),
            Err(ConverterError::InvalidRequest { .. })
        ));

        let combined = ConversionRequest::new("/in/clip.mkv", "/out/a.mp3", "mp3")
            .extracting_audio()
            .capturing_frame(FrameCapture::default());
        assert!(matches!(
            Route::select(MediaKind::Video, &combined),
            Err(ConverterError::InvalidRequest { .. })
        ));

        let negative = ConversionRequest::new("/in/clip.mkv", "/out/p.png", "png")
            .capturing_frame(FrameCapture {
                at_secs: -1.0,
                size: None,
            });
        assert!(matches!(
            build(MediaKind::Video, &negative),
            Err(ConverterError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_build_never_panics_across_the_table() {
        let pairs = [
            (MediaKind::Audio, vec!["mp3", "wav", "flac", "aac", "ogg", "m4a", "mp4", "xyz"]),
            (MediaKind::Video, vec!["mp4", "avi", "mov", "webm", "mkv", "mp3", "wmv"]),
            (MediaKind::Image, vec!["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"]),
        ];
        for (kind, targets) in pairs {
            for target in targets {
                for preset in QualityPreset::ALL {
                    let request = ConversionRequest::new("/in/x", format!("/out/x.{}", target), target)
                        .with_preset(preset);
                    match build(kind, &request) {
                        Ok(inv) => {
                            assert!(formats::lookup(kind, target).is_some());
                            assert_eq!(inv.args[2], "-y");
                        }
                        Err(ConverterError::UnsupportedFormat { .. }) => {
                            assert!(formats::lookup(kind, target).is_none());
                        }
                        Err(other) => panic!("unexpected {:?} for {} {}", other, kind, target),
                    }
                }
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let request = ConversionRequest::new("/in/clip.mkv", "/out/clip.mov", "mov").with_preset("low");
        let first = build(MediaKind::Video, &request).unwrap();
        let second = build(MediaKind::Video, &request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extra_args_precede_output() {
        let config = ConverterConfig {
            extra_ffmpeg_args: vec!["-threads".to_string(), "2".to_string()],
            ..Default::default()
        };
        let builder = CommandBuilder::new(Arc::new(config), "/scratch/temp");
        let request = ConversionRequest::new("/in/a.wav", "/out/a.ogg", "ogg");
        let inv = builder
            .build(Route::Audio, &request, &CodecParameters::default())
            .unwrap();
        let n = inv.args.len();
        assert_eq!(&inv.args[n - 3..], &["-threads", "2", "/out/a.ogg"]);
    }
}
