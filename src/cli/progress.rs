//! Sync progress display
//!
//! Renders the coordinator's [`SyncEvent`] stream with an indicatif bar on
//! a terminal, or as periodic text lines when stderr is redirected.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::app::SyncEvent;

/// Text mode prints a line whenever progress crosses a multiple of this
const TEXT_STEP: u8 = 10;

/// How progress is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Animated progress bar
    Bar,
    /// Plain lines on stderr
    Text,
    /// Nothing
    Quiet,
}

impl DisplayMode {
    /// Pick a mode from the quiet flag and whether stderr is a terminal
    pub fn detect(quiet: bool) -> Self {
        if quiet {
            DisplayMode::Quiet
        } else if atty::is(atty::Stream::Stderr) {
            DisplayMode::Bar
        } else {
            DisplayMode::Text
        }
    }
}

/// Progress display for one sync run
pub struct SyncProgressDisplay {
    mode: DisplayMode,
    bar: ProgressBar,
    percent: u8,
    committed: Vec<String>,
    finished: Option<bool>,
}

impl SyncProgressDisplay {
    /// Create a display in the given mode
    pub fn new(mode: DisplayMode) -> Self {
        let bar = match mode {
            DisplayMode::Bar => {
                let bar = ProgressBar::new(100);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                {
                    bar.set_style(style.progress_chars("##-"));
                }
                bar
            }
            DisplayMode::Text | DisplayMode::Quiet => ProgressBar::hidden(),
        };

        Self {
            mode,
            bar,
            percent: 0,
            committed: Vec::new(),
            finished: None,
        }
    }

    /// Consume events until the sender side closes
    pub async fn consume(&mut self, mut events: UnboundedReceiver<SyncEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event);
        }
        debug!("Progress channel closed");
    }

    /// Apply one event
    pub fn handle(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Planned { total, rejected } => {
                if *rejected > 0 {
                    self.line(format!("Ignoring {} unrecognized remote names", rejected));
                }
                self.line(format!("{} archives to fetch", total));
            }
            SyncEvent::ArchiveStarted { index, total, key } => {
                self.bar.set_message(format!("{}/{} {}", index + 1, total, key));
                if self.mode == DisplayMode::Text {
                    eprintln!("Fetching {} ({}/{})", key, index + 1, total);
                }
            }
            SyncEvent::Progress(value) => {
                let previous = self.percent;
                self.percent = *value;
                self.bar.set_position(u64::from(*value));
                if self.mode == DisplayMode::Text && value / TEXT_STEP > previous / TEXT_STEP {
                    eprintln!("Progress: {}%", value);
                }
            }
            SyncEvent::ArchiveCommitted { key } => {
                self.committed.push(key.clone());
                if self.mode == DisplayMode::Text {
                    eprintln!("Committed {}", key);
                }
            }
            SyncEvent::Finished { cancelled, .. } => {
                self.finished = Some(*cancelled);
                if *cancelled {
                    self.bar.abandon_with_message("Cancelled");
                } else {
                    self.bar.finish_with_message("Done");
                }
            }
        }
    }

    /// Last overall progress received
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Entries committed so far
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    /// `Some(cancelled)` once the run reported its end
    pub fn finished(&self) -> Option<bool> {
        self.finished
    }

    fn line(&self, message: String) {
        match self.mode {
            DisplayMode::Bar => self.bar.println(message),
            DisplayMode::Text => eprintln!("{}", message),
            DisplayMode::Quiet => {}
        }
    }
}

impl Drop for SyncProgressDisplay {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
