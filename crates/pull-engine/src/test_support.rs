//! Helpers shared by the crate's tests: a local origin server and an HTTP
//! client that does not depend on the host's certificate store.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use reqwest::Client;
use rustls::{ClientConfig, RootCertStore, crypto::aws_lc_rs};
use tokio::net::TcpListener;
use url::Url;

use crate::PullConfig;
use crate::fetcher::HttpFetcher;

#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Origin server on a random localhost port, shut down on drop.
pub struct TestServer {
    base_url: Url,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Plain-HTTP client with the same redirect policy as production clients.
pub fn test_client() -> Client {
    let tls_config = ClientConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub fn test_fetcher(config: PullConfig) -> HttpFetcher {
    HttpFetcher::with_client(test_client(), Arc::new(config))
}
