//! # Cache Types
//!
//! Types shared by the fetcher and the engine.

use std::fmt;
use std::path::PathBuf;

/// Identity of one tracked resource: the owner and the alias it declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub owner_id: String,
    pub alias: String,
}

impl ResourceKey {
    pub fn new(owner_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            alias: alias.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.alias)
    }
}

/// Result of probing a resource's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedVersion {
    /// Entity tag, or Last-Modified when no tag was sent
    pub version: String,
    /// URL that answered the probe after following redirects
    pub resolved_url: String,
    /// Number of redirects followed
    pub redirects: usize,
}

/// How the body of a resource ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A complete file for this version already existed; no body was requested
    Reused,
    /// The body was downloaded and written
    Downloaded { bytes: u64 },
}

/// A resource version available in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResource {
    pub path: PathBuf,
    pub version: String,
    pub outcome: FetchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_joins_owner_and_alias() {
        let key = ResourceKey::new("ca1", "icon");
        assert_eq!(key.to_string(), "ca1/icon");
    }

    #[test]
    fn keys_order_by_owner_then_alias() {
        let mut keys = vec![
            ResourceKey::new("b", "a"),
            ResourceKey::new("a", "z"),
            ResourceKey::new("a", "b"),
        ];
        keys.sort();
        assert_eq!(keys[0], ResourceKey::new("a", "b"));
        assert_eq!(keys[2], ResourceKey::new("b", "a"));
    }
}
