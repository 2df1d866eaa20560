//! Download engine: fetch, partition, write and orchestrate.
//!
//! This module turns resolved pages into files on disk under a fixed worker
//! budget.
//!
//! # Features
//!
//! - GET with bounded retry for transient statuses (429, 500, 502, 503, 504)
//! - Rotating User-Agent and fixed Referer per request
//! - Deterministic `id % threads` bucket assignment
//! - Idempotent writes: existing targets are skipped, new files are
//!   materialized atomically
//! - Best-effort post-process transform; failures keep the original file
//!
//! # Example
//!
//! ```no_run
//! use telegrab_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::default();
//! let html = client.get_text("https://telegra.ph/Some-Page-01-01").await?;
//! println!("page is {} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
pub mod filename;
mod partition;
mod retry;
mod writer;

pub use client::{ClientConfig, HttpClient};
pub use constants::{
    ASSET_TIMEOUT, CONNECT_TIMEOUT, DEFAULT_FILENAME_FORMAT, DEFAULT_THREADS, PAGE_TIMEOUT,
};
pub use engine::{DownloadEngine, EngineError, PageOutcome, split_page_urls};
pub use error::DownloadError;
pub use filename::{RenderError, WriteTarget, render_filename};
pub use partition::{partition_assets, per_page_budget};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RETRYABLE_STATUSES, RetryDecision, RetryPolicy,
    classify_error, is_idempotent,
};
pub use writer::{AssetWriter, DownloadOptions};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
