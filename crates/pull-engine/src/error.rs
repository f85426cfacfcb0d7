use std::path::PathBuf;

use reqwest::StatusCode;

/// Failure of a single fetch job.
///
/// Every variant is local to the job that produced it. Only
/// [`FetchError::CallbackSystem`] is meant to travel further, to the owner's
/// teardown path.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Unsupported protocol in {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No version in headers for {0}")]
    VersionUnavailable(String),

    #[error("Not found: {url} (status {status})")]
    NotFound { url: String, status: StatusCode },

    #[error("Too many redirects ({limit}) starting from {url}")]
    RedirectLimitExceeded { url: String, limit: usize },

    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("I/O error on {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Owner failed while handling update: {0}")]
    CallbackSystem(String),

    #[error("Owner rejected update: {0}")]
    CallbackApplication(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Classify a transport error, separating expired deadlines from other failures.
    pub(crate) fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(url.to_string())
        } else {
            FetchError::Network(err)
        }
    }

    /// True when the owner must be torn down because of this error.
    pub fn is_owner_fatal(&self) -> bool {
        matches!(self, FetchError::CallbackSystem(_))
    }
}

/// Outcome reported by a notification handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The owner itself is failing (shutdown, crash); the job must propagate this.
    #[error("system error: {0}")]
    System(String),

    /// The handler ran but reported an application-level problem.
    #[error("application error: {0}")]
    Application(String),
}

impl From<NotifyError> for FetchError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::System(msg) => FetchError::CallbackSystem(msg),
            NotifyError::Application(msg) => FetchError::CallbackApplication(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_system_callback_errors_are_fatal() {
        let fatal: FetchError = NotifyError::System("shutdown".into()).into();
        let benign: FetchError = NotifyError::Application("bad input".into()).into();

        assert!(fatal.is_owner_fatal());
        assert!(!benign.is_owner_fatal());
        assert!(!FetchError::VersionUnavailable("http://a/b".into()).is_owner_fatal());
    }

    #[test]
    fn display_names_the_url() {
        let err = FetchError::RedirectLimitExceeded {
            url: "http://example.com/loop".into(),
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "Too many redirects (10) starting from http://example.com/loop"
        );

        let err = FetchError::NotFound {
            url: "http://example.com/missing".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.to_string().contains("404"));
    }
}
