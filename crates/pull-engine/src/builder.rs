//! # PullConfig builder
//!
//! ```
//! use std::time::Duration;
//! use pull_engine::PullConfig;
//!
//! let config = PullConfig::builder()
//!     .with_cache_root("/var/cache/app")
//!     .with_probe_timeout(Duration::from_secs(10))
//!     .with_header("X-Client", "pull")
//!     .build();
//!
//! assert_eq!(config.cache_dir(), std::path::PathBuf::from("/var/cache/app/pull_cache"));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::{PullConfig, proxy::ProxyConfig};

#[derive(Debug, Clone, Default)]
pub struct PullConfigBuilder {
    config: PullConfig,
}

impl PullConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.cache_root = root.into();
        self
    }

    /// Directory below the cache root holding the per-owner directories.
    pub fn with_cache_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.config.cache_subdir = subdir.into();
        self
    }

    /// Zero disables the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Zero disables the download timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Send an extra header with every request. Names or values that are not
    /// valid HTTP are dropped with a warning.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let parsed = HeaderName::from_bytes(name.as_ref().as_bytes())
            .ok()
            .zip(HeaderValue::from_str(value.as_ref()).ok());
        match parsed {
            Some((name, value)) => {
                self.config.headers.insert(name, value);
            }
            None => warn!(header = name.as_ref(), "Ignoring invalid request header"),
        }
        self
    }

    /// Replace all extra headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Route requests through `proxy`. This turns system proxy lookup off.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false;
        self
    }

    /// Has no effect once an explicit proxy is set.
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.use_system_proxy = use_system_proxy && self.config.proxy.is_none();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> PullConfig {
        self.config
    }
}
