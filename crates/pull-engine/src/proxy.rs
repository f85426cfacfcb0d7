//! Outbound proxy settings for probe and download requests.

use std::str::FromStr;

use reqwest::Proxy;

use crate::error::FetchError;

/// Which origins are routed through the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default)]
pub enum ProxyType {
    /// Only plain `http://` origins
    #[default]
    Http,
    /// Only `https://` origins
    Https,
    /// Every origin, over SOCKS5
    Socks5,
    /// Every origin, over whatever scheme the proxy URL names
    All,
}

impl FromStr for ProxyType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "https" => Ok(ProxyType::Https),
            "socks5" => Ok(ProxyType::Socks5),
            "all" => Ok(ProxyType::All),
            other => Err(FetchError::Client(format!("unknown proxy type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy server URL, e.g. `http://proxy.example.com:8080`
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>, proxy_type: ProxyType) -> Self {
        Self {
            url: url.into(),
            proxy_type,
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Proxy URL as handed to reqwest. SOCKS5 proxies given as `host:port`
    /// get their scheme added.
    pub fn effective_url(&self) -> String {
        match self.proxy_type {
            ProxyType::Socks5 if !self.url.contains("://") => format!("socks5://{}", self.url),
            _ => self.url.clone(),
        }
    }
}

/// Turn a [`ProxyConfig`] into the reqwest proxy the client is built with.
pub fn build_proxy_from_config(config: &ProxyConfig) -> Result<Proxy, FetchError> {
    let url = config.effective_url();

    let proxy = match config.proxy_type {
        ProxyType::Http => Proxy::http(&url),
        ProxyType::Https => Proxy::https(&url),
        ProxyType::Socks5 | ProxyType::All => Proxy::all(&url),
    }
    .map_err(|e| FetchError::Client(format!("invalid {:?} proxy {url}: {e}", config.proxy_type)))?;

    Ok(match &config.auth {
        Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
        None => proxy,
    })
}
