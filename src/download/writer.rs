//! Per-asset download step: path, skip check, fetch, atomic write, transform.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use super::HttpClient;
use super::constants::DEFAULT_FILENAME_FORMAT;
use super::error::DownloadError;
use super::filename::WriteTarget;
use crate::events::{FileEvent, FileStatus};
use crate::resolver::AssetDescriptor;
use crate::transform::Transform;

/// Output settings threaded through every orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Root directory; each page gets a subdirectory named by its page id.
    pub output_root: PathBuf,
    /// Filename template with `{id}`, `{name}` and `{ext}` placeholders.
    pub filename_format: String,
    /// Whether to run the post-process transform after each write.
    pub transform_enabled: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("download"),
            filename_format: DEFAULT_FILENAME_FORMAT.to_string(),
            transform_enabled: true,
        }
    }
}

impl DownloadOptions {
    /// Options writing into `output_root` with the default template.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }
}

/// Downloads single assets to disk.
///
/// Each call is independent and always ends in exactly one [`FileEvent`];
/// failures are reported in the event, never returned.
#[derive(Clone)]
pub struct AssetWriter {
    client: HttpClient,
    transform: Option<Arc<dyn Transform>>,
}

impl std::fmt::Debug for AssetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetWriter")
            .field("client", &self.client)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl AssetWriter {
    /// Creates a writer fetching through `client`, with no transform.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            transform: None,
        }
    }

    /// Sets the transform run after each write when enabled in the options.
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Downloads `asset` into `options.output_root / page_id`.
    ///
    /// Outcomes:
    /// - `warning`: page directory could not be created, or the transform failed
    ///   (the written file is kept)
    /// - `skipped`: target already exists
    /// - `error`: fetch or write failed; nothing is left at the target path
    /// - `done`: written (and transformed)
    #[instrument(skip(self, asset, options), fields(page = %page_id, asset_id = asset.id))]
    pub async fn write(
        &self,
        page_id: &str,
        asset: &AssetDescriptor,
        options: &DownloadOptions,
    ) -> FileEvent {
        let target = WriteTarget::compute(
            &options.output_root,
            page_id,
            asset,
            &options.filename_format,
        );
        let path = target.path();
        let event = |status: FileStatus, error: Option<String>| FileEvent {
            status,
            page: page_id.to_string(),
            name: asset.name.clone(),
            filename: path.display().to_string(),
            error,
        };

        if let Err(e) = tokio::fs::create_dir_all(&target.directory).await {
            let error = DownloadError::io(&target.directory, e);
            warn!(error = %error, "cannot create page directory");
            return event(FileStatus::Warning, Some(error.to_string()));
        }

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "target exists; skipping");
            return event(FileStatus::Skipped, None);
        }

        let bytes = match self.client.get_bytes(&asset.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %asset.url, error = %e, "asset fetch failed");
                return event(FileStatus::Error, Some(e.to_string()));
            }
        };

        let directory = target.directory.clone();
        let dest = path.clone();
        let written =
            tokio::task::spawn_blocking(move || persist_new(&directory, &dest, &bytes)).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "target appeared concurrently; skipping");
                return event(FileStatus::Skipped, None);
            }
            Ok(Err(e)) => {
                let error = DownloadError::io(&path, e);
                warn!(error = %error, "asset write failed");
                return event(FileStatus::Error, Some(error.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "asset write task failed");
                return event(FileStatus::Error, Some(e.to_string()));
            }
        }

        let transform = self.transform.as_ref().filter(|_| options.transform_enabled);
        if let Some(transform) = transform {
            let transform = Arc::clone(transform);
            let target_path = path.clone();
            let result = tokio::task::spawn_blocking(move || transform.apply(&target_path)).await;
            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(error) = failure {
                warn!(path = %path.display(), error = %error, "transform failed; keeping original");
                return event(FileStatus::Warning, Some(error));
            }
        }

        debug!(path = %path.display(), "asset written");
        event(FileStatus::Done, None)
    }
}

/// Writes `bytes` to a temporary file in `directory`, then links it to
/// `dest` only if `dest` does not exist yet.
fn persist_new(directory: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(directory)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist_noclobber(dest).map_err(|e| e.error)?;
    Ok(())
}
