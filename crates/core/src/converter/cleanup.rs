//! Pre- and post-conditions around a conversion.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::error::ConverterError;
use crate::metrics;

/// Checks that `path` exists, is a regular file and can be opened for reading.
///
/// Returns the file size.
pub async fn validate_input(path: &Path) -> Result<u64, ConverterError> {
    let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
        IoErrorKind::NotFound => ConverterError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => ConverterError::InputUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(ConverterError::InputUnreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    fs::File::open(path)
        .await
        .map_err(|e| ConverterError::InputUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(metadata.len())
}

/// Makes sure the output can be written: creates the parent directory and
/// checks write access, without leaving anything behind.
pub async fn prepare_output(path: &Path) -> Result<(), ConverterError> {
    let not_writable = |reason: String| ConverterError::OutputNotWritable {
        path: path.to_path_buf(),
        reason,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().map_err(|e| not_writable(e.to_string()))?,
    };
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| not_writable(format!("cannot create {}: {}", parent.display(), e)))?;

    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => {
            return Err(not_writable("path is a directory".to_string()));
        }
        Ok(_) => {
            // Existing file: it will be overwritten, so it must open for writing.
            fs::OpenOptions::new()
                .write(true)
                .open(path)
                .await
                .map_err(|e| not_writable(e.to_string()))?;
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            let probe = parent.join(format!(".write-check-{}", uuid::Uuid::new_v4()));
            fs::File::create(&probe)
                .await
                .map_err(|e| not_writable(e.to_string()))?;
            fs::remove_file(&probe).await?;
        }
        Err(e) => return Err(not_writable(e.to_string())),
    }

    Ok(())
}

/// Removes `path` if it exists. Safe to call when nothing was written.
///
/// Returns whether a file was removed.
pub async fn discard_output(path: &Path) -> Result<bool, ConverterError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed partial output {}", path.display());
            metrics::PARTIAL_OUTPUTS_REMOVED.inc();
            Ok(true)
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            debug!("No output to remove at {}", path.display());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.wav");
        std::fs::write(&path, vec![1u8; 10]).unwrap();

        assert_eq!(validate_input(&path).await.unwrap(), 10);

        let missing = validate_input(&dir.path().join("gone.wav")).await.unwrap_err();
        assert!(matches!(missing, ConverterError::InputNotFound { .. }));

        let directory = validate_input(dir.path()).await.unwrap_err();
        assert!(matches!(directory, ConverterError::InputUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_prepare_output_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("converted").join("nested").join("a.mp3");

        prepare_output(&out).await.unwrap();
        assert!(out.parent().unwrap().is_dir());
        assert!(!out.exists());
        // The write check leaves nothing behind.
        assert_eq!(std::fs::read_dir(out.parent().unwrap()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_prepare_output_existing_file_kept() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.mp3");
        std::fs::write(&out, b"previous").unwrap();

        prepare_output(&out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_prepare_output_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare_output(dir.path()).await.unwrap_err();
        assert!(matches!(err, ConverterError::OutputNotWritable { .. }));
    }

    #[tokio::test]
    async fn test_discard_output_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("partial.mp4");
        std::fs::write(&out, b"half").unwrap();

        assert!(discard_output(&out).await.unwrap());
        assert!(!out.exists());
        assert!(!discard_output(&out).await.unwrap());
    }
}
