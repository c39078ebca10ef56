//! The runtime-side trace writer (§4.5: "The recorder writes decisions
//! synchronously at each schedule point").

use parking_lot::Mutex;

use crate::entry::TraceEntry;
use crate::Trace;

/// Thread-safe append-only recorder. The controlled runtime owns one of
/// these per iteration and pushes an entry every time the scheduling point
/// algorithm (§4.1) asks the strategy for a decision.
pub struct TraceRecorder {
    seed: u64,
    strategy: String,
    entries: Mutex<Vec<TraceEntry>>,
}

impl TraceRecorder {
    pub fn new(seed: u64, strategy: impl Into<String>) -> Self {
        TraceRecorder {
            seed,
            strategy: strategy.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append a decision. Called synchronously, while the scheduler lock is
    /// held by the caller, so entries land in wall-clock order.
    pub fn record(&self, entry: TraceEntry) -> usize {
        let mut entries = self.entries.lock();
        entries.push(entry);
        entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the recorder into an immutable [`Trace`], e.g. to render
    /// and persist after a failing iteration (§7 "A failing iteration
    /// writes its reproduction trace").
    pub fn finish(&self) -> Trace {
        Trace {
            seed: self.seed,
            strategy: self.strategy.clone(),
            entries: self.entries.lock().clone(),
        }
    }
}
