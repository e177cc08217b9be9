//! Batch progress: items finished out of total.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

/// Snapshot sent after each item finishes (successfully or not).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Items finished so far.
    pub done: usize,
    pub total: usize,
    /// Key of the item that just finished.
    pub key: String,
}

impl ProgressStats {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.done as f64 / self.total as f64).min(1.0)
    }
}

/// Shared completion counter, optionally forwarding snapshots to a channel.
#[derive(Debug)]
pub(super) struct ProgressCounter {
    done: AtomicUsize,
    total: usize,
    tx: Option<Sender<ProgressStats>>,
}

impl ProgressCounter {
    pub(super) fn new(total: usize, tx: Option<Sender<ProgressStats>>) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            tx,
        }
    }

    /// Counts one finished item. Reporting is best-effort: a dropped receiver is ignored.
    pub(super) fn finish(&self, key: &str) -> usize {
        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressStats {
                done,
                total: self.total,
                key: key.to_string(),
            });
        }
        done
    }
}
