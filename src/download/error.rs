//! Failures of a single fetch or asset write.
//!
//! Every variant keeps the URL or path it concerns, so a `FileEvent` error
//! string is enough to find the offending image.

use std::path::PathBuf;

use thiserror::Error;

/// A fetch that produced no usable body, or a write that could not land.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request never got a response (DNS, refused connection, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No complete response within the page or asset timeout.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// The server answered with a status outside 2xx after the last attempt.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        url: String,
        status: u16,
        /// Raw `Retry-After` value, kept for rate-limit backoff.
        retry_after: Option<String>,
    },

    /// Creating the page directory or the temp file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not an absolute http(s) URL; nothing was sent.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl DownloadError {
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Status error without a `Retry-After` hint.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::rejected(url, status, None)
    }

    /// Status error as seen on the wire, hint included.
    pub fn rejected(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Connection-level failure with no HTTP status.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://telegra.ph/file/a.jpg");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://telegra.ph/file/a.jpg"));
        assert!(error.is_transport());
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://telegra.ph/file/a.jpg", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(
            msg.contains("https://telegra.ph/file/a.jpg"),
            "Expected URL in: {msg}"
        );
        assert_eq!(error.status(), Some(503));
        assert!(!error.is_transport());
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/page/001_a.jpg"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/page/001_a.jpg"), "Expected path in: {msg}");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_rejected_keeps_retry_after() {
        let error = DownloadError::rejected("https://telegra.ph/p", 429, Some("5".to_string()));
        assert!(matches!(
            error,
            DownloadError::HttpStatus { status: 429, retry_after: Some(ref v), .. } if v == "5"
        ));
    }

    #[test]
    fn test_download_error_invalid_url_display() {
        let error = DownloadError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
    }
}
