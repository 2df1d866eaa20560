//! Constants for the download module (timeouts, budgets, naming).

use std::time::Duration;

/// Default HTTP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for fetching a page body.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for fetching one asset's bytes.
pub const ASSET_TIMEOUT: Duration = Duration::from_secs(20);

/// Default total worker budget for a batch.
pub const DEFAULT_THREADS: usize = 32;

/// Default filename template.
pub const DEFAULT_FILENAME_FORMAT: &str = "{id:03d}_{name}{ext}";

/// Extension used when neither the asset name nor its URL carries one.
pub const FALLBACK_EXTENSION: &str = ".jpg";
