//! Console progress subscriber: event lines on stdout, spinner on stderr.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use telegrab_core::{EventSink, FileStatus, PageAction, ProgressEvent, SinkError};

/// How events are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One human-readable line per event.
    Human,
    /// One JSON object per line.
    Json,
    /// Only `warning` and `error` lines.
    Quiet,
}

/// Running counts for the final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub pages_started: usize,
    pub pages_finished: usize,
    pub done: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl Tally {
    fn record(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Page(page) => match page.action {
                PageAction::Start => self.pages_started += 1,
                PageAction::End => self.pages_finished += 1,
            },
            ProgressEvent::File(file) => match file.status {
                FileStatus::Done => self.done += 1,
                FileStatus::Skipped => self.skipped += 1,
                FileStatus::Warning => self.warnings += 1,
                FileStatus::Error => self.errors += 1,
            },
        }
    }

    /// Files that reached a terminal state.
    #[must_use]
    pub fn files(&self) -> usize {
        self.done + self.skipped + self.warnings + self.errors
    }

    fn progress_message(&self) -> String {
        format!(
            "[{}/{} pages] {} done, {} skipped, {} warnings, {} errors",
            self.pages_finished,
            self.pages_started,
            self.done,
            self.skipped,
            self.warnings,
            self.errors
        )
    }
}

/// Prints events and keeps tallies; safe to call from every worker.
pub struct ConsoleSink {
    mode: OutputMode,
    spinner: Option<ProgressBar>,
    tally: Mutex<Tally>,
}

impl ConsoleSink {
    /// Creates a sink; the spinner is drawn only when `use_spinner` is set.
    pub fn new(mode: OutputMode, use_spinner: bool) -> Self {
        let spinner = use_spinner.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("resolving pages...");
            spinner
        });
        Self {
            mode,
            spinner,
            tally: Mutex::new(Tally::default()),
        }
    }

    /// Clears the spinner and returns the final counts.
    pub fn finish(&self) -> Tally {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
        self.tally()
    }

    /// Current counts.
    pub fn tally(&self) -> Tally {
        self.tally.lock().map(|t| *t).unwrap_or_default()
    }

    fn render(&self, event: &ProgressEvent) -> Result<Option<String>, SinkError> {
        match self.mode {
            OutputMode::Json => event
                .to_json()
                .map(Some)
                .map_err(|e| SinkError(e.to_string())),
            OutputMode::Human => Ok(Some(event.to_string())),
            OutputMode::Quiet => Ok(match event {
                ProgressEvent::File(file)
                    if matches!(file.status, FileStatus::Warning | FileStatus::Error) =>
                {
                    Some(event.to_string())
                }
                _ => None,
            }),
        }
    }

    fn print(&self, line: &str) -> io::Result<()> {
        let write = || writeln!(io::stdout().lock(), "{line}");
        match &self.spinner {
            Some(spinner) => spinner.suspend(write),
            None => write(),
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        let tally = {
            let mut tally = self
                .tally
                .lock()
                .map_err(|_| SinkError("tally lock poisoned".to_string()))?;
            tally.record(event);
            *tally
        };
        if let Some(spinner) = &self.spinner {
            spinner.set_message(tally.progress_message());
        }
        if let Some(line) = self.render(event)? {
            self.print(&line).map_err(|e| SinkError(e.to_string()))?;
        }
        Ok(())
    }
}
