//! Sync events and overall progress
//!
//! Each archive reports its own 0..100 progress (download up to 50, then
//! extraction up to 100). The coordinator folds these into a single overall
//! value across the plan and sends it, together with lifecycle events, over
//! an unbounded channel.

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::app::progress::ProgressGate;
use crate::constants::progress;

/// Events sent by a running sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The plan is known
    Planned {
        /// Archives that will be processed
        total: usize,
        /// Remote names that could not be parsed
        rejected: usize,
    },
    /// Processing of one archive begins
    ArchiveStarted {
        /// Zero-based position in the plan
        index: usize,
        /// Archives in the plan
        total: usize,
        /// Entry key of the archive
        key: String,
    },
    /// Overall progress, strictly increasing, ends at 100
    Progress(u8),
    /// An archive was extracted and its entry persisted
    ArchiveCommitted {
        /// Entry key of the archive
        key: String,
    },
    /// The run ended
    Finished {
        /// Number of entries committed
        committed: usize,
        /// Whether the run stopped because of cancellation
        cancelled: bool,
    },
}

/// Overall progress for archive `index` of `total`
///
/// `floor(item / total) + floor(index * 100 / total)`, where `item` is the
/// archive's own progress in `0..=100`.
pub fn overall_progress(item: u8, index: usize, total: usize) -> u8 {
    if total == 0 {
        return progress::COMPLETE;
    }
    let value = usize::from(item) / total + index * 100 / total;
    value.min(usize::from(progress::COMPLETE)) as u8
}

/// Folds per-archive progress into the overall stream
#[derive(Debug, Clone, Copy)]
pub struct OverallProgress {
    total: usize,
    gate: ProgressGate,
}

impl OverallProgress {
    /// Tracker for a plan of `total` archives
    pub fn new(total: usize) -> Self {
        Self {
            total,
            gate: ProgressGate::default(),
        }
    }

    /// Report archive progress, sending the overall value if it increased
    pub fn report(&mut self, index: usize, item: u8, events: &UnboundedSender<SyncEvent>) {
        let value = overall_progress(item, index, self.total);
        if let Some(value) = self.gate.advance(value) {
            trace!(index, item, overall = value, "Sync progress");
            // A dropped receiver only means nobody is watching
            let _ = events.send(SyncEvent::Progress(value));
        }
    }

    /// Report completion of the whole run
    pub fn complete(&mut self, events: &UnboundedSender<SyncEvent>) {
        if let Some(value) = self.gate.advance(progress::COMPLETE) {
            let _ = events.send(SyncEvent::Progress(value));
        }
    }

    /// Highest overall value sent so far
    pub fn reported(&self) -> u8 {
        self.gate.reported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SyncEvent::Progress(value) = event {
                values.push(value);
            }
        }
        values
    }

    #[test]
    fn test_overall_formula() {
        assert_eq!(overall_progress(50, 0, 1), 50);
        assert_eq!(overall_progress(100, 0, 1), 100);
        assert_eq!(overall_progress(50, 0, 2), 25);
        assert_eq!(overall_progress(100, 1, 2), 100);
        assert_eq!(overall_progress(100, 2, 3), 99);
        assert_eq!(overall_progress(0, 0, 0), 100);
    }

    #[test]
    fn test_single_item_stream_ends_at_100() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut overall = OverallProgress::new(1);

        for item in [10, 25, 25, 50, 51, 75, 100] {
            overall.report(0, item, &tx);
        }
        overall.complete(&tx);

        assert_eq!(drain(&mut rx), [10, 25, 50, 51, 75, 100]);
    }

    #[test]
    fn test_multi_item_stream_is_monotonic_and_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut overall = OverallProgress::new(3);

        for index in 0..3 {
            for item in [20, 50, 80, 100] {
                overall.report(index, item, &tx);
            }
        }
        overall.complete(&tx);

        let values = drain(&mut rx);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values.last(), Some(&100));
        assert_eq!(overall.reported(), 100);
    }

    #[test]
    fn test_empty_plan_reports_100() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut overall = OverallProgress::new(0);
        overall.complete(&tx);
        assert_eq!(drain(&mut rx), [100]);
    }
}
