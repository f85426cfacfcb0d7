use std::path::Path;

use async_trait::async_trait;
use pull_engine::NotifyError;
use pull_ledger::ResourceOwner;
use tracing::info;

/// Owner that accepts every delivery and logs it.
pub struct LoggingOwner;

#[async_trait]
impl ResourceOwner for LoggingOwner {
    async fn deliver(
        &self,
        handler: &str,
        alias: &str,
        path: &Path,
        version: &str,
    ) -> Result<(), NotifyError> {
        info!(handler, alias, version, path = %path.display(), "Delivered resource");
        Ok(())
    }
}
