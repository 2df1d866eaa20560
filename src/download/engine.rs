//! Page and batch orchestration.
//!
//! The engine fans out at two levels: one task per page of a batch, and one
//! task per non-empty asset bucket within a page. Both levels run inside a
//! [`JoinSet`], so no worker outlives the call that spawned it.
//!
//! # Example
//!
//! ```no_run
//! use telegrab_core::{DownloadEngine, DownloadOptions, EventBus, HttpClient, SiteProfile};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let engine = DownloadEngine::telegraph(HttpClient::default(), SiteProfile::telegraph(), None);
//! let urls = vec!["https://telegra.ph/Some-Page-01-01".to_string()];
//! let outcomes = engine
//!     .run_batch(&urls, 32, &DownloadOptions::new("download"), &EventBus::detached(), &CancellationToken::new())
//!     .await;
//! println!("{} pages processed", outcomes.len());
//! # }
//! ```

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::HttpClient;
use super::partition::{partition_assets, per_page_budget};
use super::writer::{AssetWriter, DownloadOptions};
use crate::events::{EventBus, PageAction, ProgressEvent};
use crate::resolver::{AssetDescriptor, PageResolver, ResolveError, SiteProfile, TelegraphResolver};
use crate::transform::Transform;

/// Error type for one page of a batch.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The page could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The page task panicked.
    #[error("page task failed: {0}")]
    TaskFailed(String),
}

/// Result of one page in a batch.
#[derive(Debug)]
pub struct PageOutcome {
    /// Page URL as given.
    pub url: String,
    /// Worker budget the page was given.
    pub threads: usize,
    /// `Ok` once every asset of the page was attempted.
    pub result: Result<(), EngineError>,
}

impl PageOutcome {
    /// True if the page resolved and all its workers ran.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Splits newline-separated input into page URLs, dropping blank lines.
#[must_use]
pub fn split_page_urls(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concurrent page and batch runner.
///
/// Cloning is cheap; all clones share the resolver and the writer's client.
#[derive(Clone)]
pub struct DownloadEngine {
    resolver: Arc<dyn PageResolver>,
    writer: AssetWriter,
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine from a resolver and an asset writer.
    #[must_use]
    pub fn new(resolver: Arc<dyn PageResolver>, writer: AssetWriter) -> Self {
        Self { resolver, writer }
    }

    /// Engine for pages on `profile`, sharing one client for pages and assets.
    #[must_use]
    pub fn telegraph(
        client: HttpClient,
        profile: SiteProfile,
        transform: Option<Arc<dyn Transform>>,
    ) -> Self {
        let resolver = Arc::new(TelegraphResolver::new(client.clone(), profile));
        let mut writer = AssetWriter::new(client);
        if let Some(transform) = transform {
            writer = writer.with_transform(transform);
        }
        Self::new(resolver, writer)
    }

    /// Resolves one page and downloads its assets with `threads` workers.
    ///
    /// Emits `page start` after resolution and `page end` once every bucket
    /// worker has finished, regardless of per-asset outcomes. Asset failures
    /// are reported only as events.
    ///
    /// Cancellation stops each worker before its next asset; writes already
    /// in flight complete.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the page cannot be resolved. No events are
    /// emitted in that case.
    #[instrument(skip(self, options, bus, cancel), fields(page_url = %page_url))]
    pub async fn run_page(
        &self,
        page_url: &str,
        threads: usize,
        options: &DownloadOptions,
        bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), ResolveError> {
        let job = self.resolver.resolve(page_url).await?;
        let page_id = job.page_id;
        let asset_count = job.assets.len();
        bus.emit(ProgressEvent::page(PageAction::Start, page_id.as_str()));

        let buckets = partition_assets(job.assets, threads);
        let options = Arc::new(options.clone());
        let mut workers = JoinSet::new();
        for bucket in buckets.into_iter().filter(|b| !b.is_empty()) {
            workers.spawn(run_bucket(
                self.writer.clone(),
                page_id.clone(),
                bucket,
                Arc::clone(&options),
                bus.clone(),
                cancel.clone(),
            ));
        }

        debug!(
            page = %page_id,
            assets = asset_count,
            workers = workers.len(),
            "waiting for bucket workers"
        );
        while let Some(joined) = workers.join_next().await {
            // A panicking worker loses the rest of its bucket but never the page.
            if let Err(e) = joined {
                warn!(page = %page_id, error = %e, "bucket worker panicked");
            }
        }

        bus.emit(ProgressEvent::page(PageAction::End, page_id.as_str()));
        info!(page = %page_id, assets = asset_count, "page complete");
        Ok(())
    }

    /// Runs every non-blank URL concurrently, splitting `total_threads`
    /// evenly across pages.
    ///
    /// Pages fail independently. Returns one outcome per non-blank URL, in
    /// input order; an empty input returns immediately with no events.
    #[instrument(skip(self, page_urls, options, bus, cancel))]
    pub async fn run_batch(
        &self,
        page_urls: &[String],
        total_threads: usize,
        options: &DownloadOptions,
        bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Vec<PageOutcome> {
        let urls: Vec<String> = page_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            debug!("no page URLs; nothing to do");
            return Vec::new();
        }

        let budget = per_page_budget(total_threads, urls.len());
        info!(pages = urls.len(), per_page = budget, "starting batch");

        let options = Arc::new(options.clone());
        let mut pages = JoinSet::new();
        for (index, url) in urls.iter().enumerate() {
            let engine = self.clone();
            let url = url.clone();
            let options = Arc::clone(&options);
            let bus = bus.clone();
            let cancel = cancel.clone();
            pages.spawn(async move {
                if cancel.is_cancelled() {
                    debug!(url = %url, "batch cancelled; page not started");
                    return (index, Ok(()));
                }
                let result = engine.run_page(&url, budget, &options, &bus, &cancel).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<(), EngineError>>> =
            std::iter::repeat_with(|| None).take(urls.len()).collect();
        while let Some(joined) = pages.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(e) = &result {
                        warn!(error = %e, "page failed");
                    }
                    results[index] = Some(result.map_err(EngineError::from));
                }
                Err(e) => warn!(error = %e, "page task panicked"),
            }
        }

        urls.into_iter()
            .zip(results)
            .map(|(url, result)| PageOutcome {
                url,
                threads: budget,
                result: result.unwrap_or_else(|| {
                    Err(EngineError::TaskFailed("page task panicked".to_string()))
                }),
            })
            .collect()
    }
}

/// Writes one bucket sequentially, stopping early on cancellation.
async fn run_bucket(
    writer: AssetWriter,
    page_id: String,
    bucket: Vec<AssetDescriptor>,
    options: Arc<DownloadOptions>,
    bus: EventBus,
    cancel: CancellationToken,
) {
    for asset in bucket {
        if cancel.is_cancelled() {
            debug!(page = %page_id, asset_id = asset.id, "cancelled; stopping bucket");
            break;
        }
        let event = writer.write(&page_id, &asset, &options).await;
        bus.emit(event);
    }
}
