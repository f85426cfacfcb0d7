use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::{CachedResource, ResourceKey};
use crate::job::FetchJob;
use crate::notify::ResourceNotifier;

/// Sending side of one key's serialized job queue.
pub(crate) struct JobQueue {
    pub(crate) tx: mpsc::UnboundedSender<FetchJob>,
    pub(crate) handle: JoinHandle<()>,
}

pub(crate) struct Registration {
    pub(crate) url: String,
    pub(crate) notifier: Arc<dyn ResourceNotifier>,
    pub(crate) generation: u64,
    pub(crate) queue: JobQueue,
    pub(crate) current_version: Option<String>,
    pub(crate) cached_path: Option<PathBuf>,
}

/// Snapshot of a live registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub url: String,
    pub handler: String,
    pub current_version: Option<String>,
    pub cached_path: Option<PathBuf>,
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<ResourceKey, Registration>,
    /// Workers of removed registrations that may still be running jobs.
    draining: HashMap<ResourceKey, JoinHandle<()>>,
    next_generation: u64,
}

impl Registry {
    pub(crate) fn get(&self, key: &ResourceKey) -> Option<&Registration> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &ResourceKey) -> Option<&mut Registration> {
        self.entries.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: ResourceKey, registration: Registration) {
        self.entries.insert(key, registration);
    }

    pub(crate) fn allocate_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Take the worker a new queue for `key` has to wait for, if any is still running.
    pub(crate) fn take_draining(&mut self, key: &ResourceKey) -> Option<JoinHandle<()>> {
        self.draining.retain(|_, handle| !handle.is_finished());
        self.draining.remove(key)
    }

    /// Drop the registration for `key`. Jobs already queued still run.
    pub(crate) fn remove(&mut self, key: &ResourceKey) -> bool {
        match self.entries.remove(key) {
            Some(registration) => {
                // Closing the sender lets the worker exit once its queue is empty.
                let JobQueue { tx, handle } = registration.queue;
                drop(tx);
                self.draining.insert(key.clone(), handle);
                true
            }
            None => false,
        }
    }

    pub(crate) fn keys_of_owner(&self, owner_id: &str) -> Vec<ResourceKey> {
        self.entries
            .keys()
            .filter(|key| key.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Record a completed job, unless the registration it ran for is gone.
    pub(crate) fn record_success(
        &mut self,
        key: &ResourceKey,
        generation: u64,
        cached: &CachedResource,
    ) {
        if let Some(registration) = self.entries.get_mut(key) {
            if registration.generation == generation {
                registration.current_version = Some(cached.version.clone());
                registration.cached_path = Some(cached.path.clone());
            }
        }
    }

    pub(crate) fn info(&self, key: &ResourceKey) -> Option<RegistrationInfo> {
        self.entries.get(key).map(|registration| RegistrationInfo {
            url: registration.url.clone(),
            handler: registration.notifier.handler_name().to_string(),
            current_version: registration.current_version.clone(),
            cached_path: registration.cached_path.clone(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
