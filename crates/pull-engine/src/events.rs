use std::path::PathBuf;

use crate::cache::{FetchOutcome, ResourceKey};

/// Completion report of a fetch job, broadcast to engine subscribers.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    /// The owner was notified of `version`, cached at `path`.
    Updated {
        key: ResourceKey,
        version: String,
        path: PathBuf,
        outcome: FetchOutcome,
    },
    /// The job was dropped; the resource stays at its last cached version.
    Failed {
        key: ResourceKey,
        url: String,
        error: String,
    },
    /// The owner's handler reported a system error; the owner must be torn down.
    OwnerFailure { key: ResourceKey, error: String },
}

impl ResourceEvent {
    pub fn key(&self) -> &ResourceKey {
        match self {
            ResourceEvent::Updated { key, .. }
            | ResourceEvent::Failed { key, .. }
            | ResourceEvent::OwnerFailure { key, .. } => key,
        }
    }
}
