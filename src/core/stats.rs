//! Queue statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of queue utilization and lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Configured maximum number of active slots.
    pub concurrency: usize,
    /// Slots currently running a task.
    pub active: usize,
    /// Submissions waiting in the backlog.
    pub queued: usize,
    /// Whether a flush is outstanding.
    pub flushing: bool,
    /// Total submissions accepted.
    pub submitted: u64,
    /// Total first attempts started.
    pub started: u64,
    /// Total retry attempts made.
    pub retried: u64,
    /// Submissions that resolved successfully.
    pub succeeded: u64,
    /// Submissions that failed after exhausting their attempts.
    pub failed: u64,
    /// Transitions into the empty state.
    pub drains: u64,
    /// Flushes requested.
    pub flushes: u64,
}

/// Lifetime counters shared by the queue and its running tasks.
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub submitted: AtomicU64,
    pub started: AtomicU64,
    pub retried: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub drains: AtomicU64,
    pub flushes: AtomicU64,
}

impl QueueCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Combine the counters with live state values into a snapshot.
    pub fn snapshot(&self, concurrency: usize, active: usize, queued: usize, flushing: bool) -> QueueStats {
        QueueStats {
            concurrency,
            active,
            queued,
            flushing,
            submitted: self.submitted.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}
