//! Config file loading and CLI/file/default resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use telegrab_core::download::{ASSET_TIMEOUT, PAGE_TIMEOUT};
use telegrab_core::{DEFAULT_FILENAME_FORMAT, DEFAULT_THREADS};

use crate::cli::Args;

/// Default output root when neither flag nor file sets one.
const DEFAULT_OUTPUT_DIR: &str = "download";

/// Config directory name under the XDG config home.
const APP_DIR: &str = "telegrab";

/// TOML-backed defaults; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Output root directory.
    pub output_dir: Option<PathBuf>,
    /// Total worker budget (1..=1024).
    pub threads: Option<u16>,
    /// Filename template.
    pub filename_format: Option<String>,
    /// Recompress images after download.
    pub compress: Option<bool>,
    /// Page fetch timeout in seconds (1..=3600).
    pub page_timeout_secs: Option<u64>,
    /// Image fetch timeout in seconds (1..=3600).
    pub asset_timeout_secs: Option<u64>,
    /// Attempts per request (1..=10).
    pub max_retries: Option<u8>,
    /// Site base URL.
    pub base_url: Option<String>,
}

impl FileConfig {
    /// Validates config values against the same ranges the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        if let Some(threads) = self.threads
            && !(1..=1024).contains(&threads)
        {
            bail!("Invalid config value for `threads`: {threads}. Expected range: 1..=1024");
        }
        if let Some(retries) = self.max_retries
            && !(1..=10).contains(&retries)
        {
            bail!("Invalid config value for `max_retries`: {retries}. Expected range: 1..=10");
        }
        validate_timeout_secs("page_timeout_secs", self.page_timeout_secs)?;
        validate_timeout_secs("asset_timeout_secs", self.asset_timeout_secs)?;
        if let Some(format) = &self.filename_format
            && format.trim().is_empty()
        {
            bail!("Invalid config value for `filename_format`: must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/telegrab/config.toml`
/// 2. `$HOME/.config/telegrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path, if one exists.
pub fn load_default_file_config() -> Result<Option<FileConfig>> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

/// Reads, parses and validates a config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub threads: usize,
    pub output_dir: PathBuf,
    pub filename_format: String,
    pub compress: bool,
    pub page_timeout: Duration,
    pub asset_timeout: Duration,
    pub max_retries: u32,
    pub base_url: Option<String>,
}

impl RunSettings {
    /// Merges CLI flags over file values over built-in defaults.
    #[must_use]
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        Self {
            threads: args
                .threads
                .or(file.threads)
                .map_or(DEFAULT_THREADS, usize::from),
            output_dir: args
                .output
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            filename_format: args
                .filename_format
                .clone()
                .or(file.filename_format)
                .unwrap_or_else(|| DEFAULT_FILENAME_FORMAT.to_string()),
            compress: !args.no_compress && file.compress.unwrap_or(true),
            page_timeout: args
                .page_timeout
                .or(file.page_timeout_secs)
                .map_or(PAGE_TIMEOUT, Duration::from_secs),
            asset_timeout: args
                .asset_timeout
                .or(file.asset_timeout_secs)
                .map_or(ASSET_TIMEOUT, Duration::from_secs),
            max_retries: args
                .max_retries
                .or(file.max_retries)
                .map_or(telegrab_core::download::DEFAULT_MAX_RETRIES, u32::from),
            base_url: args.base_url.clone().or(file.base_url),
        }
    }
}
