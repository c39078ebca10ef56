//! FIFO inbox with defer/ignore-aware dequeue (§3.3, §4.3).

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use weave_core::EventKind;

use crate::event::Event;

/// An actor's mailbox. Plain `VecDeque`, not `Mutex`-wrapped: the runtime
/// guarantees at most one operation touches an actor's state at a time
/// (§3.3 invariant "an actor executes at most one handler at a time"), so
/// no internal synchronization is needed here — that invariant is the
/// scheduler's job, not the inbox's.
#[derive(Debug, Default)]
pub struct Inbox {
    queue: VecDeque<Event>,
}

impl Inbox {
    pub fn new() -> Self {
        Inbox::default()
    }

    pub fn enqueue(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    /// Dispatch-time dequeue (§4.3 "Inbox dispatch"): scan head to tail,
    /// skipping events in `defer` (left in place), dropping events in
    /// `ignore` (removed, discarded, scan continues), and returning the
    /// first event that is neither.
    pub fn dequeue_for_dispatch(
        &mut self,
        defer: &FxHashSet<EventKind>,
        ignore: &FxHashSet<EventKind>,
    ) -> Option<Event> {
        let mut idx = 0;
        while idx < self.queue.len() {
            let kind = self.queue[idx].kind.clone();
            if defer.contains(&kind) {
                idx += 1;
                continue;
            }
            if ignore.contains(&kind) {
                self.queue.remove(idx);
                continue;
            }
            return self.queue.remove(idx);
        }
        None
    }

    /// `receive_one` dequeue (§4.3 "Receive-await"): the first event whose
    /// kind is in `kinds`, wherever it sits in the queue.
    pub fn dequeue_matching(&mut self, kinds: &FxHashSet<EventKind>) -> Option<Event> {
        let idx = self.queue.iter().position(|e| kinds.contains(&e.kind))?;
        self.queue.remove(idx)
    }
}
