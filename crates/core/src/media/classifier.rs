//! File classification.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::kind::MediaKind;
use super::probe::MediaProber;
use crate::converter::ConverterError;

/// What is known about an input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub kind: MediaKind,
    /// Playback duration; audio and video only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Pixel width; video and image only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height; video and image only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Assigns a [`MediaKind`] to a file and enriches it with probed metadata.
///
/// The extension alone decides the kind. The optional prober only fills in
/// duration and dimensions, and its failure never changes the kind or fails
/// classification.
#[derive(Clone, Default)]
pub struct FileClassifier {
    prober: Option<Arc<dyn MediaProber>>,
}

impl FileClassifier {
    /// Classifier that never probes.
    pub fn new() -> Self {
        Self { prober: None }
    }

    /// Classifier that enriches descriptors through `prober`.
    pub fn with_prober(prober: Arc<dyn MediaProber>) -> Self {
        Self {
            prober: Some(prober),
        }
    }

    /// Classifies the file at `path`.
    ///
    /// Only a failed stat is an error; an unknown extension yields
    /// [`MediaKind::Unknown`].
    pub async fn classify(&self, path: &Path) -> Result<FileDescriptor, ConverterError> {
        let mut descriptor = self.describe(path).await?;
        self.enrich(&mut descriptor).await;
        Ok(descriptor)
    }

    /// Stat and extension lookup only; never starts a process.
    pub async fn describe(&self, path: &Path) -> Result<FileDescriptor, ConverterError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConverterError::InputNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConverterError::InputUnreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(FileDescriptor {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            kind: MediaKind::from_path(path),
            duration_secs: None,
            width: None,
            height: None,
        })
    }

    /// Fills in probed metadata. Leaves `kind` untouched and swallows probe
    /// failures.
    pub async fn enrich(&self, descriptor: &mut FileDescriptor) {
        let kind = descriptor.kind;
        if kind == MediaKind::Unknown {
            return;
        }
        let Some(prober) = &self.prober else {
            return;
        };

        match prober.probe(&descriptor.path).await {
            Ok(report) => {
                if kind.is_timed() {
                    descriptor.duration_secs = report.duration_secs;
                }
                if kind.is_visual() {
                    descriptor.width = report.width;
                    descriptor.height = report.height;
                }
            }
            Err(e) => {
                debug!(
                    "Probe of {} failed, metadata unknown: {}",
                    descriptor.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ProbeReport;
    use async_trait::async_trait;

    struct FixedProber(Result<ProbeReport, ()>);

    #[async_trait]
    impl MediaProber for FixedProber {
        async fn probe(&self, _path: &Path) -> Result<ProbeReport, ConverterError> {
            self.0
                .clone()
                .map_err(|_| ConverterError::probe_failed("no prober"))
        }
    }

    fn video_report() -> ProbeReport {
        ProbeReport {
            format: "mov".to_string(),
            duration_secs: Some(12.5),
            width: Some(1280),
            height: Some(720),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_classify_missing_file() {
        let classifier = FileClassifier::new();
        let err = classifier
            .classify(Path::new("/nonexistent/sample.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_classify_without_prober() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.WAV");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let descriptor = FileClassifier::new().classify(&path).await.unwrap();
        assert_eq!(descriptor.kind, MediaKind::Audio);
        assert_eq!(descriptor.size_bytes, 64);
        assert_eq!(descriptor.duration_secs, None);
    }

    #[tokio::test]
    async fn test_probe_enriches_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Arc::new(FixedProber(Ok(video_report())));
        let classifier = FileClassifier::with_prober(prober);

        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"video").unwrap();
        let descriptor = classifier.classify(&clip).await.unwrap();
        assert_eq!(descriptor.duration_secs, Some(12.5));
        assert_eq!(descriptor.width, Some(1280));

        // Audio never carries dimensions, images never carry a duration.
        let song = dir.path().join("song.mp3");
        std::fs::write(&song, b"audio").unwrap();
        let descriptor = classifier.classify(&song).await.unwrap();
        assert_eq!(descriptor.duration_secs, Some(12.5));
        assert_eq!(descriptor.width, None);

        let photo = dir.path().join("photo.png");
        std::fs::write(&photo, b"image").unwrap();
        let descriptor = classifier.classify(&photo).await.unwrap();
        assert_eq!(descriptor.duration_secs, None);
        assert_eq!(descriptor.height, Some(720));
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        std::fs::write(&path, b"garbage").unwrap();

        let classifier = FileClassifier::with_prober(Arc::new(FixedProber(Err(()))));
        let descriptor = classifier.classify(&path).await.unwrap();
        assert_eq!(descriptor.kind, MediaKind::Video);
        assert_eq!(descriptor.width, None);
    }

    #[tokio::test]
    async fn test_classify_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        std::fs::write(&path, b"frames").unwrap();

        let classifier = FileClassifier::with_prober(Arc::new(FixedProber(Ok(video_report()))));
        let first = classifier.classify(&path).await.unwrap();
        let second = classifier.classify(&path).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let descriptor = FileClassifier::new().classify(&path).await.unwrap();
        assert_eq!(descriptor.kind, MediaKind::Unknown);
    }
}
