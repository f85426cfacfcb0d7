use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pull_engine::{NotifyError, ResourceNotifier};

/// The entity on whose behalf resources are tracked.
///
/// `deliver` hands an updated resource to the owner's handler named
/// `handler`. Returning [`NotifyError::System`] means the owner is gone and
/// must be torn down; application errors are logged and ignored.
#[async_trait]
pub trait ResourceOwner: Send + Sync {
    async fn deliver(
        &self,
        handler: &str,
        alias: &str,
        path: &Path,
        version: &str,
    ) -> Result<(), NotifyError>;
}

/// Notifier for one alias, routing to a named handler of an owner.
pub struct HandlerBinding {
    owner: Arc<dyn ResourceOwner>,
    handler: String,
    alias: String,
}

impl HandlerBinding {
    pub fn new(owner: Arc<dyn ResourceOwner>, handler: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            owner,
            handler: handler.into(),
            alias: alias.into(),
        }
    }
}

#[async_trait]
impl ResourceNotifier for HandlerBinding {
    async fn notify(&self, path: &Path, version: &str) -> Result<(), NotifyError> {
        self.owner
            .deliver(&self.handler, &self.alias, path, version)
            .await
    }

    fn handler_name(&self) -> &str {
        &self.handler
    }
}
