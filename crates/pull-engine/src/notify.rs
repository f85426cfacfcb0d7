use std::path::Path;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Receives the location and version of a resource each time a fetch job
/// completes for it.
///
/// Implementations must be idempotent: recovery and repeated refreshes may
/// deliver the same `(path, version)` more than once.
#[async_trait]
pub trait ResourceNotifier: Send + Sync {
    async fn notify(&self, path: &Path, version: &str) -> Result<(), NotifyError>;

    /// Name of the handler behind this notifier, for diagnostics.
    fn handler_name(&self) -> &str {
        "anonymous"
    }
}
