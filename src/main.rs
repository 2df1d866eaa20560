//! CLI entry point for telegrab.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use telegrab_core::{
    ClientConfig, DownloadEngine, DownloadOptions, EventBus, HttpClient, ImageRecompressor,
    RetryPolicy, SiteProfile, Transform, split_page_urls,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

mod app;
mod cli;

use app::config::{RunSettings, load_default_file_config};
use app::console::{ConsoleSink, OutputMode};
use app::interrupt::{ABORT_EXIT_CODE, watch_interrupts};
use app::terminal::{
    default_log_level, init_tracing, is_dumb_terminal, no_color_env_requested, should_use_spinner,
};
use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    init_tracing(
        default_log_level(args.quiet, args.verbose),
        no_color_env_requested() || is_dumb_terminal(),
    );
    debug!(?args, "CLI arguments parsed");

    let file_config = load_default_file_config()?;
    let settings = RunSettings::resolve(&args, file_config.as_ref());
    debug!(?settings, "effective settings");

    // Read input: from positional args or stdin
    let input_text = if !args.urls.is_empty() {
        args.urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pipe page URLs via stdin or pass them as arguments.");
        info!("Example: echo 'https://telegra.ph/Some-Page-01-01' | telegrab");
        return Ok(ExitCode::SUCCESS);
    };

    let urls = split_page_urls(&input_text);
    if urls.is_empty() {
        info!("No page URLs found in input");
        return Ok(ExitCode::SUCCESS);
    }

    let profile = match &settings.base_url {
        Some(base_url) => SiteProfile::new(base_url)?,
        None => SiteProfile::telegraph(),
    };
    let client = HttpClient::new(ClientConfig {
        page_timeout: settings.page_timeout,
        asset_timeout: settings.asset_timeout,
        retry_policy: RetryPolicy::with_max_attempts(settings.max_retries),
        referer: profile.referer(),
        ..ClientConfig::default()
    });
    let transform = settings
        .compress
        .then(|| Arc::new(ImageRecompressor::default()) as Arc<dyn Transform>);
    let engine = DownloadEngine::telegraph(client, profile, transform);
    let options = DownloadOptions {
        output_root: settings.output_dir.clone(),
        filename_format: settings.filename_format.clone(),
        transform_enabled: settings.compress,
    };

    let mode = if args.json {
        OutputMode::Json
    } else if args.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Human
    };
    let use_spinner = should_use_spinner(io::stderr().is_terminal(), args.quiet, is_dumb_terminal());
    let console = Arc::new(ConsoleSink::new(mode, use_spinner));
    let bus = EventBus::new(Arc::clone(&console) as Arc<dyn telegrab_core::EventSink>);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, interrupt).await {
            std::process::exit(ABORT_EXIT_CODE);
        }
    });

    info!(
        pages = urls.len(),
        threads = settings.threads,
        output = %settings.output_dir.display(),
        "Telegrab starting"
    );
    let outcomes = engine
        .run_batch(&urls, settings.threads, &options, &bus, &cancel)
        .await;
    let tally = console.finish();

    let mut failed_pages = 0usize;
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            failed_pages += 1;
            error!(url = %outcome.url, error = %e, "Page failed");
        }
    }

    info!(
        pages = outcomes.len(),
        failed_pages,
        files = tally.files(),
        done = tally.done,
        skipped = tally.skipped,
        warnings = tally.warnings,
        errors = tally.errors,
        "Download complete"
    );

    if cancel.is_cancelled() || failed_pages > 0 || tally.errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
