//! Version probing and body download over HTTP(S).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ETAG, HeaderMap, LAST_MODIFIED, LOCATION};
use tracing::trace;
use url::Url;

use crate::PullConfig;
use crate::cache::{ProbedVersion, write_atomically};
use crate::client::create_client;
use crate::error::FetchError;

/// Network side of a fetch job.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Resolve the current version token of the resource at `url`.
    async fn probe(&self, url: &str) -> Result<ProbedVersion, FetchError>;

    /// Download the body at `url` into `target`, returning the bytes written.
    ///
    /// The parent directory of `target` already exists when this is called.
    async fn download(&self, url: &str, target: &Path) -> Result<u64, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    config: Arc<PullConfig>,
}

impl HttpFetcher {
    pub fn new(config: Arc<PullConfig>) -> Result<Self, FetchError> {
        let client = create_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-provided client. It must not follow redirects on its own.
    pub fn with_client(client: Client, config: Arc<PullConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn probe(&self, url: &str) -> Result<ProbedVersion, FetchError> {
        let mut current = parse_supported(url)?;
        let mut redirects = 0usize;

        loop {
            let mut request = self.client.head(current.clone());
            if !self.config.probe_timeout.is_zero() {
                request = request.timeout(self.config.probe_timeout);
            }

            let response = request
                .send()
                .await
                .map_err(|e| FetchError::from_transport(current.as_str(), e))?;
            let status = response.status();

            if status.is_success() {
                return match version_from_headers(response.headers()) {
                    Some(version) => Ok(ProbedVersion {
                        version,
                        resolved_url: current.to_string(),
                        redirects,
                    }),
                    None => Err(FetchError::VersionUnavailable(current.to_string())),
                };
            }

            if status.is_redirection() {
                if let Some(location) = header_str(response.headers(), LOCATION) {
                    if redirects >= self.config.max_redirects {
                        return Err(FetchError::RedirectLimitExceeded {
                            url: url.to_string(),
                            limit: self.config.max_redirects,
                        });
                    }

                    let next = current.join(location).map_err(|e| FetchError::InvalidUrl {
                        url: location.to_string(),
                        reason: e.to_string(),
                    })?;
                    let next = ensure_supported(next)?;
                    trace!(from = %current, to = %next, hop = redirects + 1, "Following redirect");

                    current = next;
                    redirects += 1;
                    continue;
                }
            }

            return Err(FetchError::NotFound {
                url: current.to_string(),
                status,
            });
        }
    }

    async fn download(&self, url: &str, target: &Path) -> Result<u64, FetchError> {
        let parsed = parse_supported(url)?;

        let mut request = self.client.get(parsed);
        if !self.config.fetch_timeout.is_zero() {
            request = request.timeout(self.config.fetch_timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| FetchError::from_transport(url, e)));

        write_atomically(target, body).await
    }
}

/// Parse `url`, rejecting anything that is not http or https.
pub fn parse_supported(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    ensure_supported(parsed)
}

fn ensure_supported(url: Url) -> Result<Url, FetchError> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::UnsupportedProtocol(url.to_string())),
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Entity tag if present, otherwise the Last-Modified timestamp.
pub fn version_from_headers(headers: &HeaderMap) -> Option<String> {
    header_str(headers, ETAG)
        .or_else(|| header_str(headers, LAST_MODIFIED))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestServer, init_tracing, test_fetcher};
    use axum::Router;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Counters {
        gets: Arc<AtomicUsize>,
    }

    async fn tagged(State(counters): State<Counters>, method: axum::http::Method) -> impl IntoResponse {
        if method == axum::http::Method::GET {
            counters.gets.fetch_add(1, Ordering::SeqCst);
        }
        ([(header::ETAG, "v1")], "icon-bytes")
    }

    async fn dated() -> impl IntoResponse {
        (
            [(header::LAST_MODIFIED, "Tue, 15 Nov 1994 12:45:26 GMT")],
            "dated-bytes",
        )
    }

    async fn unversioned() -> impl IntoResponse {
        "no version here"
    }

    async fn hop(UrlPath(remaining): UrlPath<u32>) -> impl IntoResponse {
        if remaining == 0 {
            ([(header::ETAG, "end")], "end").into_response()
        } else {
            (
                StatusCode::FOUND,
                [(header::LOCATION, format!("/hop/{}", remaining - 1))],
            )
                .into_response()
        }
    }

    async fn relative() -> impl IntoResponse {
        (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "tagged")])
    }

    async fn slow() -> impl IntoResponse {
        tokio::time::sleep(Duration::from_secs(2)).await;
        ([(header::ETAG, "late")], "late")
    }

    /// Five chunks, 200ms apart.
    async fn trickle() -> impl IntoResponse {
        let chunks = futures::stream::iter(0..5).then(|i| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, std::io::Error>(format!("chunk{i}"))
        });
        ([(header::ETAG, "v1")], axum::body::Body::from_stream(chunks))
    }

    fn router(counters: Counters) -> Router {
        Router::new()
            .route("/tagged", get(tagged))
            .route("/dated", get(dated))
            .route("/unversioned", get(unversioned))
            .route("/hop/{remaining}", get(hop))
            .route("/dir/relative", get(relative))
            .route("/dir/tagged", get(tagged))
            .route("/slow", get(slow))
            .route("/trickle", get(trickle))
            .with_state(counters)
    }

    fn fetcher(config: PullConfig) -> HttpFetcher {
        test_fetcher(config)
    }

    #[tokio::test]
    async fn probe_prefers_etag() {
        init_tracing();
        let server = TestServer::new(router(Counters::default())).await;

        let probed = fetcher(PullConfig::default())
            .probe(server.url("/tagged").as_str())
            .await
            .unwrap();

        assert_eq!(probed.version, "v1");
        assert_eq!(probed.redirects, 0);
    }

    #[tokio::test]
    async fn probe_falls_back_to_last_modified() {
        let server = TestServer::new(router(Counters::default())).await;

        let probed = fetcher(PullConfig::default())
            .probe(server.url("/dated").as_str())
            .await
            .unwrap();

        assert_eq!(probed.version, "Tue, 15 Nov 1994 12:45:26 GMT");
    }

    #[tokio::test]
    async fn probe_without_version_headers_fails() {
        let server = TestServer::new(router(Counters::default())).await;

        let err = fetcher(PullConfig::default())
            .probe(server.url("/unversioned").as_str())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::VersionUnavailable(_)));
    }

    #[tokio::test]
    async fn probe_of_missing_resource_is_not_found() {
        let server = TestServer::new(router(Counters::default())).await;

        let err = fetcher(PullConfig::default())
            .probe(server.url("/missing").as_str())
            .await
            .unwrap_err();

        match err {
            FetchError::NotFound { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected_before_any_request() {
        let err = fetcher(PullConfig::default())
            .probe("ftp://example.com/icon.png")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedProtocol(_)));

        let err = fetcher(PullConfig::default())
            .probe("not a url")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn ten_redirects_are_followed() {
        let server = TestServer::new(router(Counters::default())).await;

        let probed = fetcher(PullConfig::default())
            .probe(server.url("/hop/10").as_str())
            .await
            .unwrap();

        assert_eq!(probed.version, "end");
        assert_eq!(probed.redirects, 10);
        assert!(probed.resolved_url.ends_with("/hop/0"));
    }

    #[tokio::test]
    async fn eleven_redirects_exceed_the_bound() {
        let server = TestServer::new(router(Counters::default())).await;

        let err = fetcher(PullConfig::default())
            .probe(server.url("/hop/11").as_str())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::RedirectLimitExceeded { limit: 10, .. }
        ));
    }

    #[tokio::test]
    async fn relative_location_is_resolved_against_current_url() {
        let server = TestServer::new(router(Counters::default())).await;

        let probed = fetcher(PullConfig::default())
            .probe(server.url("/dir/relative").as_str())
            .await
            .unwrap();

        assert_eq!(probed.version, "v1");
        assert!(probed.resolved_url.ends_with("/dir/tagged"));
    }

    #[tokio::test]
    async fn probe_timeout_is_reported_as_timeout() {
        let server = TestServer::new(router(Counters::default())).await;
        let config = PullConfig::builder()
            .with_probe_timeout(Duration::from_millis(200))
            .build();

        let err = fetcher(config)
            .probe(server.url("/slow").as_str())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn fetch_timeout_aborts_a_slow_body() {
        init_tracing();
        let server = TestServer::new(router(Counters::default())).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("trickle-v1");
        let config = PullConfig::builder()
            .with_fetch_timeout(Duration::from_millis(300))
            .build();

        let err = fetcher(config)
            .download(server.url("/trickle").as_str(), &target)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
        assert!(!err.is_owner_fatal());
        assert!(!target.exists());
        assert!(!dir.path().join("trickle-v1.part").exists());
    }

    #[tokio::test]
    async fn download_streams_body_to_target() {
        let counters = Counters::default();
        let server = TestServer::new(router(counters.clone())).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("icon-v1");

        let written = fetcher(PullConfig::default())
            .download(server.url("/tagged").as_str(), &target)
            .await
            .unwrap();

        assert_eq!(written, "icon-bytes".len() as u64);
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"icon-bytes");
        assert_eq!(counters.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn download_of_missing_resource_writes_nothing() {
        let server = TestServer::new(router(Counters::default())).await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("gone-v1");

        let err = fetcher(PullConfig::default())
            .download(server.url("/missing").as_str(), &target)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::NotFound { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn version_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(LAST_MODIFIED, HeaderValue::from_static("yesterday"));
        assert_eq!(version_from_headers(&headers).as_deref(), Some("yesterday"));

        headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        assert_eq!(version_from_headers(&headers).as_deref(), Some("\"abc\""));

        headers.insert(ETAG, HeaderValue::from_static(""));
        assert_eq!(version_from_headers(&headers).as_deref(), Some("yesterday"));
    }
}
