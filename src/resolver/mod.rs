//! Page resolution: one page URL in, one [`PageJob`] out.
//!
//! # Architecture
//!
//! - [`PageResolver`] - Async trait the orchestrator resolves pages through
//! - [`TelegraphResolver`] - Resolver for pages hosted on a [`SiteProfile`]
//! - [`extract_image_sources`] - `<img src>` scanner used by the resolver
//!
//! # Example
//!
//! ```no_run
//! use telegrab_core::download::HttpClient;
//! use telegrab_core::resolver::{PageResolver, SiteProfile, TelegraphResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = TelegraphResolver::new(HttpClient::default(), SiteProfile::telegraph());
//! let job = resolver.resolve("https://telegra.ph/Some-Page-01-01").await?;
//! println!("{}: {} assets", job.page_id, job.assets.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod extract;
mod telegraph;

pub use error::ResolveError;
pub use extract::extract_image_sources;
pub use telegraph::{SiteProfile, TelegraphResolver};

use async_trait::async_trait;

/// One downloadable asset referenced by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Zero-based position in extraction order, unique within the page.
    pub id: usize,
    /// Display name, also the source of the file stem.
    pub name: String,
    /// Absolute URL.
    pub url: String,
}

impl AssetDescriptor {
    /// Creates a descriptor.
    pub fn new(id: usize, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A resolved page: its stable id and the assets to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    /// URL the page was resolved from.
    pub source_url: String,
    /// Filesystem-safe slug, used as the output subdirectory.
    pub page_id: String,
    /// Assets in extraction order.
    pub assets: Vec<AssetDescriptor>,
}

/// Turns a page URL into a [`PageJob`].
///
/// Implementations perform their own network I/O and must not retry beyond
/// what the shared fetch client already does.
#[async_trait]
pub trait PageResolver: Send + Sync {
    /// Resolves `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPageUrl`] before any request when the
    /// page id cannot be derived, or [`ResolveError::Fetch`] when the page
    /// body cannot be fetched.
    async fn resolve(&self, page_url: &str) -> Result<PageJob, ResolveError>;
}
