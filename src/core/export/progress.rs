//! Table completion counter

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts finished tables out of a fixed total
///
/// Shared between concurrently running table exports. Only drives the
/// `[completed/total]` log lines.
#[derive(Debug)]
pub struct ProgressReporter {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Records one finished table and returns the new completed count
    pub fn increment(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn read(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
