//! Resolver for pages hosted on a known publishing site.

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::error::ResolveError;
use super::extract::extract_image_sources;
use super::{AssetDescriptor, PageJob, PageResolver};
use crate::download::HttpClient;
use crate::download::filename::sanitize_component;

/// Base URL of the default site.
pub const TELEGRAPH_BASE_URL: &str = "https://telegra.ph";

/// Prefix stripped from relative references to form the display name.
const FILE_PREFIX: &str = "/file/";

/// The site pages are resolved against.
///
/// The host marker, the prefix for relative references and the `Referer`
/// header are all derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    base_url: String,
    marker: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::telegraph()
    }
}

impl SiteProfile {
    /// Profile for `https://telegra.ph`.
    #[must_use]
    pub fn telegraph() -> Self {
        Self {
            base_url: TELEGRAPH_BASE_URL.to_string(),
            marker: "telegra.ph".to_string(),
        }
    }

    /// Profile for an arbitrary base such as `http://127.0.0.1:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL with a host.
    pub fn new(base_url: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidBaseUrl {
            url: base_url.to_string(),
        };
        let parsed = Url::parse(base_url).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = parsed.host_str().ok_or_else(invalid)?;
        let marker = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            marker,
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host (and port, if any) that every page URL must contain.
    #[must_use]
    pub fn host_marker(&self) -> &str {
        &self.marker
    }

    /// `Referer` header value for requests to this site.
    #[must_use]
    pub fn referer(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Derives the page id from a page URL.
    ///
    /// The URL is percent-decoded (invalid UTF-8 becomes U+FFFD), everything after `<marker>/` is kept,
    /// query and fragment are dropped, and the result is sanitized for use as
    /// a directory name.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPageUrl`] if the marker is absent or
    /// nothing usable follows it.
    ///
    /// # Example
    ///
    /// ```
    /// use telegrab_core::resolver::SiteProfile;
    ///
    /// let profile = SiteProfile::telegraph();
    /// let id = profile.page_id("https://telegra.ph/My%20Page-05-01").unwrap();
    /// assert_eq!(id, "My Page-05-01");
    /// ```
    pub fn page_id(&self, page_url: &str) -> Result<String, ResolveError> {
        let invalid = || ResolveError::invalid_page_url(page_url, &self.marker);
        let bytes = urlencoding::decode_binary(page_url.trim().as_bytes());
        let decoded = String::from_utf8_lossy(&bytes);
        let needle = format!("{}/", self.marker);
        let start = decoded.find(&needle).ok_or_else(invalid)? + needle.len();

        let rest = &decoded[start..];
        let path = rest.split(['?', '#']).next().unwrap_or(rest);
        let id = sanitize_component(path.trim_end_matches('/')).trim().to_string();
        if id.is_empty() || id.chars().all(|c| c == '.') {
            return Err(invalid());
        }
        Ok(id)
    }

    /// Turns an extracted reference into `(display name, absolute URL)`.
    #[must_use]
    pub fn absolutize(&self, src: &str) -> (String, String) {
        if src.starts_with("http://") || src.starts_with("https://") {
            let path = src.split(['?', '#']).next().unwrap_or(src);
            let name = path.rsplit('/').next().unwrap_or(path);
            return (name.to_string(), src.to_string());
        }

        let url = if src.starts_with("//") {
            let scheme = self.base_url.split(':').next().unwrap_or("https");
            format!("{scheme}:{src}")
        } else if src.starts_with('/') {
            format!("{}{src}", self.base_url)
        } else {
            format!("{}/{src}", self.base_url)
        };
        let name = src
            .strip_prefix(FILE_PREFIX)
            .unwrap_or_else(|| src.trim_start_matches('/'));
        (name.to_string(), url)
    }
}

/// Resolves pages by fetching their HTML and scanning it for images.
#[derive(Debug, Clone)]
pub struct TelegraphResolver {
    client: HttpClient,
    profile: SiteProfile,
}

impl TelegraphResolver {
    /// Creates a resolver that fetches through `client`.
    #[must_use]
    pub fn new(client: HttpClient, profile: SiteProfile) -> Self {
        Self { client, profile }
    }
}

#[async_trait]
impl PageResolver for TelegraphResolver {
    #[instrument(skip(self), fields(page_url = %page_url))]
    async fn resolve(&self, page_url: &str) -> Result<PageJob, ResolveError> {
        let page_id = self.profile.page_id(page_url)?;
        let html = self.client.get_text(page_url.trim()).await?;

        let assets: Vec<AssetDescriptor> = extract_image_sources(&html)
            .iter()
            .enumerate()
            .map(|(id, src)| {
                let (name, url) = self.profile.absolutize(src);
                AssetDescriptor { id, name, url }
            })
            .collect();

        debug!(page_id = %page_id, assets = assets.len(), "page resolved");
        Ok(PageJob {
            source_url: page_url.to_string(),
            page_id,
            assets,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::ClientConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_page_id_strips_host_and_decodes() {
        let profile = SiteProfile::telegraph();
        assert_eq!(
            profile.page_id("https://telegra.ph/Page-A-01-02").unwrap(),
            "Page-A-01-02"
        );
        assert_eq!(
            profile
                .page_id("https://telegra.ph/%D0%A2%D0%B5%D1%81%D1%82-05-01?x=1")
                .unwrap(),
            "Тест-05-01"
        );
        assert_eq!(profile.page_id("  https://telegra.ph/p/  ").unwrap(), "p");
    }

    #[test]
    fn test_page_id_decodes_invalid_utf8_lossily() {
        let profile = SiteProfile::telegraph();
        assert_eq!(
            profile.page_id("https://telegra.ph/Bad-%FF-01").unwrap(),
            "Bad-\u{FFFD}-01"
        );
    }

    #[test]
    fn test_page_id_rejects_foreign_host() {
        let profile = SiteProfile::telegraph();
        let error = profile.page_id("https://example.com/Page-A").unwrap_err();
        assert!(error.is_invalid_page_url());
    }

    #[test]
    fn test_page_id_rejects_empty_path() {
        let profile = SiteProfile::telegraph();
        assert!(profile.page_id("https://telegra.ph/").is_err());
        assert!(profile.page_id("https://telegra.ph/..").is_err());
    }

    #[test]
    fn test_page_id_sanitizes_separators() {
        let profile = SiteProfile::telegraph();
        assert_eq!(profile.page_id("https://telegra.ph/a/b").unwrap(), "ab");
    }

    #[test]
    fn test_profile_from_base_url_with_port() {
        let profile = SiteProfile::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(profile.host_marker(), "127.0.0.1:8080");
        assert_eq!(profile.base_url(), "http://127.0.0.1:8080");
        assert_eq!(profile.referer(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_profile_rejects_non_http_base() {
        assert!(SiteProfile::new("ftp://host").is_err());
        assert!(SiteProfile::new("not a url").is_err());
    }

    #[test]
    fn test_absolutize_relative_and_absolute() {
        let profile = SiteProfile::telegraph();
        assert_eq!(
            profile.absolutize("/file/abc.jpg"),
            (
                "abc.jpg".to_string(),
                "https://telegra.ph/file/abc.jpg".to_string()
            )
        );
        assert_eq!(
            profile.absolutize("https://cdn.example/img/x.png?s=1"),
            (
                "x.png".to_string(),
                "https://cdn.example/img/x.png?s=1".to_string()
            )
        );
        assert_eq!(
            profile.absolutize("//cdn.example/y.gif").1,
            "https://cdn.example/y.gif"
        );
    }

    #[tokio::test]
    async fn test_resolve_assigns_ids_in_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Page-A"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<img src="/file/one.jpg"><p>x</p><img src="https://cdn.example/two.png">"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let profile = SiteProfile::new(&mock_server.uri()).unwrap();
        let resolver = TelegraphResolver::new(HttpClient::new(ClientConfig::default()), profile);
        let job = resolver
            .resolve(&format!("{}/Page-A", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(job.page_id, "Page-A");
        assert_eq!(job.assets.len(), 2);
        assert_eq!(job.assets[0].id, 0);
        assert_eq!(job.assets[0].name, "one.jpg");
        assert_eq!(
            job.assets[0].url,
            format!("{}/file/one.jpg", mock_server.uri())
        );
        assert_eq!(job.assets[1].id, 1);
        assert_eq!(job.assets[1].url, "https://cdn.example/two.png");
    }

    #[tokio::test]
    async fn test_resolve_invalid_url_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let profile = SiteProfile::new(&mock_server.uri()).unwrap();
        let resolver = TelegraphResolver::new(HttpClient::default(), profile);
        let result = resolver.resolve("https://example.com/Page-A").await;
        assert!(matches!(result, Err(ResolveError::InvalidPageUrl { .. })));
    }
}
