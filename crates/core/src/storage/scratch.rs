use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::StorageError;
use crate::config::StorageConfig;
use crate::media::normalize_extension;

/// The three scratch areas: incoming inputs, converted outputs, and the
/// external tool's working directory.
///
/// Every generated name is a random token plus an extension, so concurrent
/// requests never share a file.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    incoming: PathBuf,
    converted: PathBuf,
    working: PathBuf,
}

/// Result of a time-based sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub files_removed: usize,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
}

impl SweepReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ScratchSpace {
    pub fn new(
        incoming: impl Into<PathBuf>,
        converted: impl Into<PathBuf>,
        working: impl Into<PathBuf>,
    ) -> Self {
        Self {
            incoming: incoming.into(),
            converted: converted.into(),
            working: working.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.incoming_dir,
            &config.converted_dir,
            &config.working_dir,
        )
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming
    }

    pub fn converted_dir(&self) -> &Path {
        &self.converted
    }

    pub fn working_dir(&self) -> &Path {
        &self.working
    }

    /// Creates all three areas.
    pub async fn ensure(&self) -> Result<(), StorageError> {
        for dir in [&self.incoming, &self.converted, &self.working] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    /// Fresh path in the incoming area.
    pub fn incoming_path(&self, extension: &str) -> PathBuf {
        self.incoming.join(token_name(extension))
    }

    /// Fresh path in the converted area.
    pub fn converted_path(&self, extension: &str) -> PathBuf {
        self.converted.join(token_name(extension))
    }

    /// Copies `source` into the incoming area under a fresh name, keeping its
    /// extension.
    pub async fn stage_input(&self, source: &Path) -> Result<PathBuf, StorageError> {
        let metadata = fs::metadata(source)
            .await
            .map_err(|e| StorageError::io(source, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile {
                path: source.to_path_buf(),
            });
        }

        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let destination = self.incoming_path(&extension);

        fs::create_dir_all(&self.incoming)
            .await
            .map_err(|e| StorageError::io(&self.incoming, e))?;
        fs::copy(source, &destination)
            .await
            .map_err(|e| StorageError::io(&destination, e))?;

        debug!(
            "Staged {} as {}",
            source.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Removes a staged input once it has been handed off. Missing files are
    /// not an error.
    pub async fn release_input(&self, path: &Path) -> Result<bool, StorageError> {
        if !path.starts_with(&self.incoming) {
            return Err(StorageError::OutsideScratch {
                path: path.to_path_buf(),
            });
        }
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Removes regular files older than `max_age` from all three areas.
    ///
    /// Only the top level of each area is considered; a missing area is
    /// skipped. Individual failures are collected, not fatal.
    pub async fn sweep_expired(&self, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        for dir in [&self.incoming, &self.converted, &self.working] {
            let mut entries = match fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    report
                        .errors
                        .push(format!("Failed to read directory {}: {}", dir.display(), e));
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        report
                            .errors
                            .push(format!("Failed to list {}: {}", dir.display(), e));
                        break;
                    }
                };

                let path = entry.path();
                let metadata = match entry.metadata().await {
                    Ok(metadata) if metadata.is_file() => metadata,
                    Ok(_) => continue,
                    Err(e) => {
                        report
                            .errors
                            .push(format!("Failed to stat {}: {}", path.display(), e));
                        continue;
                    }
                };

                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age <= max_age {
                    continue;
                }

                match fs::remove_file(&path).await {
                    Ok(()) => {
                        report.files_removed += 1;
                        report.bytes_freed += metadata.len();
                    }
                    Err(e) => report
                        .errors
                        .push(format!("Failed to remove {}: {}", path.display(), e)),
                }
            }
        }

        if report.files_removed > 0 {
            info!(
                "Swept {} expired files ({} bytes)",
                report.files_removed, report.bytes_freed
            );
        }
        if !report.success() {
            warn!("Sweep finished with {} errors", report.errors.len());
        }
        report
    }
}

fn token_name(extension: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let extension = normalize_extension(extension);
    if extension.is_empty() {
        token
    } else {
        format!("{}.{}", token, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(root: &Path) -> ScratchSpace {
        ScratchSpace::from_config(&StorageConfig::rooted_at(root))
    }

    #[tokio::test]
    async fn test_ensure_creates_areas() {
        let root = tempfile::tempdir().unwrap();
        let scratch = scratch(root.path());
        scratch.ensure().await.unwrap();
        assert!(scratch.incoming_dir().is_dir());
        assert!(scratch.converted_dir().is_dir());
        assert!(scratch.working_dir().is_dir());
    }

    #[test]
    fn test_generated_paths_are_unique() {
        let scratch = ScratchSpace::new("/s/in", "/s/out", "/s/tmp");
        let a = scratch.converted_path("MP3");
        let b = scratch.converted_path(".mp3");
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "mp3");
        assert!(a.starts_with("/s/out"));
        assert!(scratch.incoming_path("").extension().is_none());
    }

    #[tokio::test]
    async fn test_stage_and_release_input() {
        let root = tempfile::tempdir().unwrap();
        let scratch = scratch(root.path());
        let source = root.path().join("Sample.WAV");
        std::fs::write(&source, b"RIFF").unwrap();

        let staged = scratch.stage_input(&source).await.unwrap();
        assert!(staged.starts_with(scratch.incoming_dir()));
        assert_eq!(staged.extension().unwrap(), "wav");
        assert_eq!(std::fs::read(&staged).unwrap(), b"RIFF");
        assert!(source.exists());

        assert!(scratch.release_input(&staged).await.unwrap());
        assert!(!scratch.release_input(&staged).await.unwrap());

        let outside = scratch.release_input(&source).await.unwrap_err();
        assert!(matches!(outside, StorageError::OutsideScratch { .. }));
    }

    #[tokio::test]
    async fn test_stage_rejects_directory() {
        let root = tempfile::tempdir().unwrap();
        let scratch = scratch(root.path());
        let err = scratch.stage_input(root.path()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let root = tempfile::tempdir().unwrap();
        let scratch = scratch(root.path());
        scratch.ensure().await.unwrap();

        std::fs::write(scratch.converted_path("mp3"), vec![0u8; 100]).unwrap();
        std::fs::write(scratch.incoming_path("wav"), vec![0u8; 50]).unwrap();
        std::fs::create_dir(scratch.working_dir().join("subdir")).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let report = scratch.sweep_expired(Duration::from_secs(3600)).await;
        assert_eq!(report.files_removed, 0);

        let report = scratch.sweep_expired(Duration::from_millis(10)).await;
        assert_eq!(report.files_removed, 2);
        assert_eq!(report.bytes_freed, 150);
        assert!(report.success());
        assert!(scratch.working_dir().join("subdir").is_dir());
    }

    #[tokio::test]
    async fn test_sweep_missing_areas() {
        let root = tempfile::tempdir().unwrap();
        let scratch = scratch(&root.path().join("never-created"));
        let report = scratch.sweep_expired(Duration::ZERO).await;
        assert_eq!(report, SweepReport::default());
    }
}
