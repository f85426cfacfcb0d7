use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::proxy::ProxyConfig;

const DEFAULT_USER_AGENT: &str = concat!("pull-engine/", env!("CARGO_PKG_VERSION"));

/// Subdirectory of the cache root used when none is configured.
pub const DEFAULT_CACHE_SUBDIR: &str = "pull_cache";

/// Number of redirects followed while probing before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configurable options for the pull engine
#[derive(Debug, Clone)]
pub struct PullConfig {
    /// Root directory under which cached resources are stored
    pub cache_root: PathBuf,

    /// Subdirectory of `cache_root` holding the per-owner directories
    pub cache_subdir: String,

    /// Timeout for the version probe (HEAD) request
    pub probe_timeout: Duration,

    /// Timeout for the body download, including streaming it to disk
    pub fetch_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Maximum number of redirects followed by a probe
    pub max_redirects: usize,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    /// Capacity of the engine event channel
    pub event_capacity: usize,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            cache_root: std::env::temp_dir().join("pull-cache-root"),
            cache_subdir: DEFAULT_CACHE_SUBDIR.to_owned(),
            probe_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: PullConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
            event_capacity: 256,
        }
    }
}

impl PullConfig {
    pub fn builder() -> crate::builder::PullConfigBuilder {
        crate::builder::PullConfigBuilder::new()
    }

    /// Directory that holds every owner's cached files.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.cache_subdir)
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        // Cached files must hold the bytes exactly as served.
        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("identity"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_joins_root_and_subdir() {
        let config = PullConfig {
            cache_root: PathBuf::from("/var/cache/app"),
            ..PullConfig::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/var/cache/app/pull_cache"));
    }

    #[test]
    fn defaults_follow_ten_redirects() {
        let config = PullConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.cache_subdir, "pull_cache");
        assert!(config.headers.contains_key(reqwest::header::ACCEPT_ENCODING));
    }
}
