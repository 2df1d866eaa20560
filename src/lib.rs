//! Telegrab Core Library
//!
//! This library provides the download engine behind the `telegrab` tool,
//! which fetches telegra.ph pages, extracts their embedded images and
//! downloads them to disk under a bounded worker budget.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Fetch client with retry, asset writer, work partitioning
//!   and the page/batch orchestrators
//! - [`resolver`] - Page resolution: page id derivation and asset extraction
//! - [`events`] - Structured progress events and the best-effort event bus
//! - [`transform`] - Optional post-process step applied to written assets
//!
//! Every run is idempotent: assets whose target file already exists are
//! reported as skipped and never fetched again.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod events;
pub mod resolver;
pub mod transform;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    AssetWriter, ClientConfig, DEFAULT_FILENAME_FORMAT, DEFAULT_THREADS, DownloadEngine,
    DownloadError, DownloadOptions, EngineError, FailureType, HttpClient, PageOutcome,
    RetryDecision, RetryPolicy, classify_error, partition_assets, per_page_budget,
    render_filename, split_page_urls,
};
pub use events::{
    ChannelSink, EventBus, EventSink, FileEvent, FileStatus, PageAction, PageEvent,
    ProgressEvent, SinkError,
};
pub use resolver::{
    AssetDescriptor, PageJob, PageResolver, ResolveError, SiteProfile, TelegraphResolver,
    extract_image_sources,
};
pub use transform::{ImageRecompressor, Transform, TransformError};
