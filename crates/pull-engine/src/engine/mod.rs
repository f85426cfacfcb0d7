//! # Resource Cache Engine
//!
//! Keeps the live registrations of every owner, keyed by `(owner, alias)`.
//! Each key has one serialized job queue: jobs for the same key run strictly
//! one after another in the order they were queued, while jobs for different
//! keys run concurrently. Registration calls are synchronous and may be made
//! from any thread; workers run on the runtime the engine was created in.

mod registry;
mod worker;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

pub use registry::RegistrationInfo;

use crate::PullConfig;
use crate::cache::{CacheLayout, ResourceKey};
use crate::error::FetchError;
use crate::events::ResourceEvent;
use crate::fetcher::{HttpFetcher, ResourceFetcher};
use crate::job::{FetchJob, run_job};
use crate::notify::ResourceNotifier;
use registry::{Registration, Registry};

#[derive(Clone)]
pub struct ResourceCacheEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    layout: CacheLayout,
    fetcher: Arc<dyn ResourceFetcher>,
    runtime: Handle,
    registry: Mutex<Registry>,
    events: broadcast::Sender<ResourceEvent>,
}

impl ResourceCacheEngine {
    /// Create an engine that fetches over HTTP(S). Must be called from within
    /// a tokio runtime.
    pub fn new(config: PullConfig) -> Result<Self, FetchError> {
        let runtime = Handle::try_current()
            .map_err(|e| FetchError::Client(format!("no tokio runtime for pull engine: {e}")))?;
        let config = Arc::new(config);
        let fetcher = HttpFetcher::new(Arc::clone(&config))?;
        Ok(Self::with_runtime(&config, Arc::new(fetcher), runtime))
    }

    /// Create an engine around a custom fetcher, spawning workers on the
    /// current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Use [`Self::with_runtime`]
    /// to pass a handle explicitly.
    pub fn with_fetcher(config: &PullConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self::with_runtime(config, fetcher, Handle::current())
    }

    pub fn with_runtime(
        config: &PullConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        runtime: Handle,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let layout = CacheLayout::from_config(config);
        info!(cache_dir = ?layout.dir(), "New pull engine");

        Self {
            inner: Arc::new(EngineInner {
                layout,
                fetcher,
                runtime,
                registry: Mutex::new(Registry::default()),
                events,
            }),
        }
    }

    /// Create or replace the registration for `(owner_id, alias)` and queue a
    /// fetch for it. A fetch is queued even if the registration already existed.
    pub fn add_resource(
        &self,
        owner_id: &str,
        alias: &str,
        url: &str,
        notifier: Arc<dyn ResourceNotifier>,
    ) {
        let key = ResourceKey::new(owner_id, alias);
        let mut registry = self.inner.registry.lock();
        self.enqueue(&mut registry, key, url, notifier);
    }

    /// Point the registration for `key` at `url` and `notifier`, creating it
    /// if needed, and queue one job. The caller holds the registry lock.
    fn enqueue(
        &self,
        registry: &mut Registry,
        key: ResourceKey,
        url: &str,
        notifier: Arc<dyn ResourceNotifier>,
    ) {
        let job = FetchJob {
            key: key.clone(),
            url: url.to_string(),
            notifier: Arc::clone(&notifier),
        };

        let job = match registry.get_mut(&key) {
            Some(registration) => {
                registration.url = url.to_string();
                registration.notifier = Arc::clone(&notifier);
                match registration.queue.tx.send(job) {
                    Ok(()) => {
                        trace!(%key, url, "Queued fetch");
                        return;
                    }
                    Err(mpsc::error::SendError(job)) => {
                        warn!(%key, "Job queue worker is gone, restarting it");
                        registry.remove(&key);
                        job
                    }
                }
            }
            None => job,
        };

        let generation = registry.allocate_generation();
        let previous = registry.take_draining(&key);
        let queue = worker::spawn_queue(
            &self.inner.runtime,
            Arc::downgrade(&self.inner),
            key.clone(),
            generation,
            previous,
        );
        // The worker was just spawned and holds the receiver.
        let _ = queue.tx.send(job);

        trace!(%key, url, generation, "Registered resource and queued fetch");
        registry.insert(
            key,
            Registration {
                url: url.to_string(),
                notifier,
                generation,
                queue,
                current_version: None,
                cached_path: None,
            },
        );
    }

    /// Drop the registration for `(owner_id, alias)`.
    ///
    /// A job that is already queued or running still completes. Cached files
    /// are left on disk.
    pub fn remove_resource(&self, owner_id: &str, alias: &str) -> bool {
        let key = ResourceKey::new(owner_id, alias);
        let removed = self.inner.registry.lock().remove(&key);
        if removed {
            debug!(owner = owner_id, alias, "Removed resource");
        } else {
            trace!(owner = owner_id, alias, "Remove of unknown resource ignored");
        }
        removed
    }

    /// Queue a fetch for an existing registration with its current URL and
    /// handler. Returns `false`, with a warning, when nothing is registered.
    ///
    /// The lookup and the enqueue happen under one lock, so a refresh racing a
    /// removal never brings the registration back.
    pub fn refresh_resource(&self, owner_id: &str, alias: &str) -> bool {
        let key = ResourceKey::new(owner_id, alias);
        let mut registry = self.inner.registry.lock();
        let existing = registry
            .get(&key)
            .map(|registration| (registration.url.clone(), Arc::clone(&registration.notifier)));

        match existing {
            Some((url, notifier)) => {
                self.enqueue(&mut registry, key, &url, notifier);
                true
            }
            None => {
                drop(registry);
                warn!(owner = owner_id, alias, "Cannot refresh non-loaded resource");
                false
            }
        }
    }

    /// Drop every registration of one owner, returning how many were removed.
    pub fn remove_owner(&self, owner_id: &str) -> usize {
        let mut registry = self.inner.registry.lock();
        let keys = registry.keys_of_owner(owner_id);
        for key in &keys {
            registry.remove(key);
        }
        debug!(owner = owner_id, count = keys.len(), "Removed all resources of owner");
        keys.len()
    }

    pub fn registration(&self, owner_id: &str, alias: &str) -> Option<RegistrationInfo> {
        self.inner
            .registry
            .lock()
            .info(&ResourceKey::new(owner_id, alias))
    }

    pub fn is_registered(&self, owner_id: &str, alias: &str) -> bool {
        self.inner
            .registry
            .lock()
            .get(&ResourceKey::new(owner_id, alias))
            .is_some()
    }

    /// Aliases currently registered for `owner_id`, sorted.
    pub fn registered_aliases(&self, owner_id: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .inner
            .registry
            .lock()
            .keys_of_owner(owner_id)
            .into_iter()
            .map(|key| key.alias)
            .collect();
        aliases.sort();
        aliases
    }

    /// Total number of live registrations across all owners.
    pub fn len(&self) -> usize {
        self.inner.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive a [`ResourceEvent`] for every job that completes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.inner.events.subscribe()
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.inner.layout
    }
}

impl EngineInner {
    async fn process(&self, job: FetchJob, generation: u64) {
        let owner = job.key.owner_id.as_str();
        let alias = job.key.alias.as_str();

        match run_job(self.fetcher.as_ref(), &self.layout, &job).await {
            Ok(cached) => {
                self.registry
                    .lock()
                    .record_success(&job.key, generation, &cached);
                debug!(owner, alias, version = %cached.version, outcome = ?cached.outcome, "Resource updated");
                let _ = self.events.send(ResourceEvent::Updated {
                    key: job.key.clone(),
                    version: cached.version,
                    path: cached.path,
                    outcome: cached.outcome,
                });
            }
            Err(err) if err.is_owner_fatal() => {
                error!(owner, alias, error = %err, "Owner failed while handling resource update");
                let _ = self.events.send(ResourceEvent::OwnerFailure {
                    key: job.key.clone(),
                    error: err.to_string(),
                });
            }
            Err(err) => {
                debug!(owner, alias, url = %job.url, error = %err, "Cannot load resource");
                let _ = self.events.send(ResourceEvent::Failed {
                    key: job.key.clone(),
                    url: job.url.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
}
