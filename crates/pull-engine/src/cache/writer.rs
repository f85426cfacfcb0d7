//! # Cache Writer
//!
//! Filesystem helpers for storing downloaded bodies. A body is streamed to a
//! `.part` sibling and renamed into place only once complete, so the final
//! path either does not exist or holds the whole body.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::FetchError;

/// Create `dir` and its parents. Losing a creation race is not an error.
pub async fn ensure_dir(dir: &Path) -> Result<(), FetchError> {
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
                Ok(())
            } else {
                Err(FetchError::filesystem(dir, e))
            }
        }
        Err(e) => Err(FetchError::filesystem(dir, e)),
    }
}

/// Whether a complete cache entry exists at `path`.
pub async fn entry_exists(path: &Path) -> Result<bool, FetchError> {
    fs::try_exists(path)
        .await
        .map_err(|e| FetchError::filesystem(path, e))
}

pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Stream `body` into `path`, returning the number of bytes written.
pub async fn write_atomically<S>(path: &Path, body: S) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<Bytes, FetchError>>,
{
    let temp_path = part_path(path);

    match write_body(&temp_path, body).await {
        Ok(written) => {
            if let Err(e) = fs::rename(&temp_path, path).await {
                warn!(from = ?temp_path, to = ?path, error = %e, "Failed to move downloaded body into place");
                let _ = fs::remove_file(&temp_path).await;
                return Err(FetchError::filesystem(path, e));
            }
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(e)
        }
    }
}

async fn write_body<S>(temp_path: &Path, body: S) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<Bytes, FetchError>>,
{
    let mut body = std::pin::pin!(body);
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| FetchError::filesystem(temp_path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::filesystem(temp_path, e))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| FetchError::filesystem(temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| FetchError::filesystem(temp_path, e))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn writes_whole_body_then_renames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon-v1");
        let body = stream::iter(vec![
            Ok::<_, FetchError>(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);

        let written = write_atomically(&path, body).await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello world");
        assert!(!entry_exists(&part_path(&path)).await.unwrap());
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon-v2");
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FetchError::Timeout("http://example.com/icon".into())),
        ]);

        let err = write_atomically(&path, body).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(!entry_exists(&path).await.unwrap());
        assert!(!entry_exists(&part_path(&path)).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_dir_is_idempotent_under_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pull_cache").join("ca1");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let target = target.clone();
                tokio::spawn(async move { ensure_dir(&target).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(target.is_dir());
    }

    #[test]
    fn part_path_appends_suffix() {
        let path = Path::new("/cache/ca1/icon-v1.png");
        assert_eq!(part_path(path), PathBuf::from("/cache/ca1/icon-v1.png.part"));
    }
}
