use std::sync::Arc;

use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::proxy::build_proxy_from_config;
use crate::PullConfig;

/// Create a reqwest Client with the provided configuration.
///
/// Redirects are never followed by the client itself; probes follow them
/// explicitly so the hop count stays bounded by [`PullConfig::max_redirects`].
pub fn create_client(config: &PullConfig) -> Result<Client, FetchError> {
    let provider = Arc::new(aws_lc_rs::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::Client(format!("TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| FetchError::Client(format!("platform verifier: {e}")))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .redirect(reqwest::redirect::Policy::none());

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        let proxy = build_proxy_from_config(proxy_config)?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy for resource pulls");
    } else if config.use_system_proxy {
        // reqwest's default: proxy env vars plus the OS proxy settings
        // (`system-proxy` feature).
        debug!("Using system proxy settings for resource pulls");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled for resource pulls");
    }

    client_builder.build().map_err(FetchError::from)
}
