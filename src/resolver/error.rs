//! Error types for page resolution.
//!
//! Resolution errors are fatal to one page only; sibling pages in a batch
//! keep running.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors that can occur while resolving a page into a [`PageJob`](super::PageJob).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The page path cannot be derived from the URL.
    #[error("cannot derive page path from '{url}': expected a '{marker}/<page>' URL\n  Suggestion: {suggestion}")]
    InvalidPageUrl {
        /// The rejected URL.
        url: String,
        /// Host marker that was expected.
        marker: String,
        /// How to fix the input.
        suggestion: &'static str,
    },

    /// The configured site base URL is unusable.
    #[error("invalid site base URL '{url}'")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
    },

    /// Fetching the page body failed.
    #[error("failed to fetch page: {0}")]
    Fetch(#[from] DownloadError),
}

impl ResolveError {
    /// Creates an `InvalidPageUrl` error.
    #[must_use]
    pub fn invalid_page_url(url: &str, marker: &str) -> Self {
        Self::InvalidPageUrl {
            url: url.to_string(),
            marker: marker.to_string(),
            suggestion: "Pass the full page URL, e.g. https://telegra.ph/Some-Page-01-01",
        }
    }

    /// True when the input URL itself was rejected, before any network call.
    #[must_use]
    pub fn is_invalid_page_url(&self) -> bool {
        matches!(self, Self::InvalidPageUrl { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_page_url_display() {
        let error = ResolveError::invalid_page_url("https://example.com/x", "telegra.ph");
        let msg = error.to_string();
        assert!(msg.contains("https://example.com/x"), "Expected URL in: {msg}");
        assert!(msg.contains("telegra.ph/<page>"), "Expected marker in: {msg}");
        assert!(msg.contains("Suggestion:"), "Expected suggestion in: {msg}");
        assert!(error.is_invalid_page_url());
    }

    #[test]
    fn test_fetch_error_wraps_download_error() {
        let error = ResolveError::from(DownloadError::http_status("https://telegra.ph/p", 404));
        assert!(error.to_string().contains("HTTP 404"));
        assert!(!error.is_invalid_page_url());
    }
}
