use std::sync::Arc;

use pull_engine::{RegistrationInfo, ResourceCacheEngine, ResourceNotifier};

/// Where committed operations are forwarded.
pub trait ResourceSink: Send + Sync {
    fn add_resource(&self, owner_id: &str, alias: &str, url: &str, notifier: Arc<dyn ResourceNotifier>);

    fn remove_resource(&self, owner_id: &str, alias: &str) -> bool;

    fn refresh_resource(&self, owner_id: &str, alias: &str) -> bool;

    fn registration(&self, owner_id: &str, alias: &str) -> Option<RegistrationInfo>;

    fn remove_owner(&self, owner_id: &str) -> usize;
}

impl ResourceSink for ResourceCacheEngine {
    fn add_resource(&self, owner_id: &str, alias: &str, url: &str, notifier: Arc<dyn ResourceNotifier>) {
        ResourceCacheEngine::add_resource(self, owner_id, alias, url, notifier)
    }

    fn remove_resource(&self, owner_id: &str, alias: &str) -> bool {
        ResourceCacheEngine::remove_resource(self, owner_id, alias)
    }

    fn refresh_resource(&self, owner_id: &str, alias: &str) -> bool {
        ResourceCacheEngine::refresh_resource(self, owner_id, alias)
    }

    fn registration(&self, owner_id: &str, alias: &str) -> Option<RegistrationInfo> {
        ResourceCacheEngine::registration(self, owner_id, alias)
    }

    fn remove_owner(&self, owner_id: &str) -> usize {
        ResourceCacheEngine::remove_owner(self, owner_id)
    }
}
