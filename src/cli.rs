//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download every image of one or more telegra.ph pages.
///
/// Pages are read from the arguments, or one per line from stdin when no
/// arguments are given. Each page is saved under `<output>/<page>/`; files
/// that already exist are skipped, so interrupted runs can simply be
/// restarted.
#[derive(Parser, Debug)]
#[command(name = "telegrab")]
#[command(author, version, about)]
pub struct Args {
    /// Page URLs to download
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Total concurrent workers, split evenly across pages (1-1024) [default: 32]
    #[arg(short = 't', long, value_parser = clap::value_parser!(u16).range(1..=1024))]
    pub threads: Option<u16>,

    /// Output root directory [default: ./download]
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Filename template using {id}, {name} and {ext} [default: {id:03d}_{name}{ext}]
    #[arg(short = 'f', long)]
    pub filename_format: Option<String>,

    /// Keep downloaded images as-is instead of recompressing them
    #[arg(long)]
    pub no_compress: bool,

    /// Print progress events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Page fetch timeout in seconds (1-3600) [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub page_timeout: Option<u64>,

    /// Image fetch timeout in seconds (1-3600) [default: 20]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub asset_timeout: Option<u64>,

    /// Maximum attempts per request for transient failures (1-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Base URL of the site pages are hosted on [default: https://telegra.ph]
    #[arg(long)]
    pub base_url: Option<String>,
}
