//! A fetch job: probe the version, load the body unless that version is
//! already cached, then tell the owner.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::{CacheLayout, CachedResource, FetchOutcome, ResourceKey, ensure_dir, entry_exists};
use crate::error::{FetchError, NotifyError};
use crate::fetcher::ResourceFetcher;
use crate::notify::ResourceNotifier;

#[derive(Clone)]
pub struct FetchJob {
    pub key: ResourceKey,
    pub url: String,
    pub notifier: Arc<dyn ResourceNotifier>,
}

impl std::fmt::Debug for FetchJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchJob")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("handler", &self.notifier.handler_name())
            .finish()
    }
}

pub async fn run_job(
    fetcher: &dyn ResourceFetcher,
    layout: &CacheLayout,
    job: &FetchJob,
) -> Result<CachedResource, FetchError> {
    let owner = job.key.owner_id.as_str();
    let alias = job.key.alias.as_str();

    trace!(owner, alias, "begin head");
    let probed = fetcher.probe(&job.url).await?;

    trace!(owner, alias, version = %probed.version, "begin load");
    let path = layout.entry_path(owner, alias, &probed.version);
    let outcome = if entry_exists(&path).await? {
        debug!(owner, alias, version = %probed.version, path = ?path, "Version already cached, skipping body");
        FetchOutcome::Reused
    } else {
        ensure_dir(&layout.owner_dir(owner)).await?;
        let bytes = fetcher.download(&probed.resolved_url, &path).await?;
        FetchOutcome::Downloaded { bytes }
    };

    trace!(owner, alias, "begin update");
    match job.notifier.notify(&path, &probed.version).await {
        Ok(()) => {}
        Err(NotifyError::System(msg)) => return Err(FetchError::CallbackSystem(msg)),
        Err(NotifyError::Application(msg)) => {
            warn!(owner, alias, handler = job.notifier.handler_name(), error = %msg, "Update handler reported an error, ignoring");
        }
    }

    Ok(CachedResource {
        path,
        version: probed.version,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProbedVersion;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedVersion {
        version: String,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl ResourceFetcher for FixedVersion {
        async fn probe(&self, url: &str) -> Result<ProbedVersion, FetchError> {
            Ok(ProbedVersion {
                version: self.version.clone(),
                resolved_url: url.to_string(),
                redirects: 0,
            })
        }

        async fn download(&self, _url: &str, target: &Path) -> Result<u64, FetchError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(target, b"body").await.unwrap();
            Ok(4)
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(PathBuf, String)>>,
        reply: Option<NotifyError>,
    }

    #[async_trait]
    impl ResourceNotifier for Recorder {
        async fn notify(&self, path: &Path, version: &str) -> Result<(), NotifyError> {
            self.calls.lock().push((path.to_path_buf(), version.to_string()));
            match &self.reply {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn job(notifier: Arc<Recorder>) -> FetchJob {
        FetchJob {
            key: ResourceKey::new("ca1", "icon"),
            url: "http://example.com/icon.png".into(),
            notifier,
        }
    }

    #[tokio::test]
    async fn same_version_is_downloaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path().join("pull_cache"));
        let fetcher = FixedVersion {
            version: "v1".into(),
            downloads: AtomicUsize::new(0),
        };
        let recorder = Arc::new(Recorder::default());

        let first = run_job(&fetcher, &layout, &job(recorder.clone())).await.unwrap();
        let second = run_job(&fetcher, &layout, &job(recorder.clone())).await.unwrap();

        let expected = dir.path().join("pull_cache").join("ca1").join("icon-v1");
        assert_eq!(first.path, expected);
        assert_eq!(first.outcome, FetchOutcome::Downloaded { bytes: 4 });
        assert_eq!(second.outcome, FetchOutcome::Reused);
        assert_eq!(fetcher.downloads.load(Ordering::SeqCst), 1);

        let calls = recorder.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (expected.clone(), "v1".to_string()));
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn application_errors_from_handler_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        let fetcher = FixedVersion {
            version: "v1".into(),
            downloads: AtomicUsize::new(0),
        };
        let recorder = Arc::new(Recorder {
            reply: Some(NotifyError::Application("bad icon".into())),
            ..Recorder::default()
        });

        let cached = run_job(&fetcher, &layout, &job(recorder)).await.unwrap();
        assert_eq!(cached.version, "v1");
    }

    #[tokio::test]
    async fn system_errors_from_handler_fail_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        let fetcher = FixedVersion {
            version: "v1".into(),
            downloads: AtomicUsize::new(0),
        };
        let recorder = Arc::new(Recorder {
            reply: Some(NotifyError::System("owner shut down".into())),
            ..Recorder::default()
        });

        let err = run_job(&fetcher, &layout, &job(recorder)).await.unwrap_err();
        assert!(err.is_owner_fatal());
        // the body is still cached for the next attempt
        assert!(layout.entry_path("ca1", "icon", "v1").exists());
    }
}
