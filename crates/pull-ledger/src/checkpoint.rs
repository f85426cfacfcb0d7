use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::operation::PendingOperation;

/// A committed resource declaration.
///
/// `current_version` and `cached_path` mirror what the engine last delivered
/// and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub alias: String,
    pub url: String,
    pub notify_handler_name: String,
    #[serde(skip)]
    pub current_version: Option<String>,
    #[serde(skip)]
    pub cached_path: Option<PathBuf>,
}

impl ResourceDescriptor {
    pub fn new(
        alias: impl Into<String>,
        url: impl Into<String>,
        notify_handler_name: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            url: url.into(),
            notify_handler_name: notify_handler_name.into(),
            current_version: None,
            cached_path: None,
        }
    }

    /// The operation that recreates this declaration on replay.
    pub fn to_add(&self) -> PendingOperation {
        PendingOperation::Add {
            alias: self.alias.clone(),
            url: self.url.clone(),
            notify_handler: self.notify_handler_name.clone(),
        }
    }
}

/// Durable ledger snapshot, produced by `prepare` and consumed by `restore`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDescriptor>,
    #[serde(default)]
    pub pending_operations: Vec<PendingOperation>,
}

impl Checkpoint {
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a snapshot. An empty blob is an empty checkpoint.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Operations that rebuild the engine state: one `Add` per committed
    /// resource, then the log that was pending when the snapshot was taken.
    pub fn replay_log(&self) -> Vec<PendingOperation> {
        self.resources
            .values()
            .map(ResourceDescriptor::to_add)
            .chain(self.pending_operations.iter().cloned())
            .collect()
    }
}
