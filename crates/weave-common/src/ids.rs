//! Stable identifiers minted from process-wide atomic counters.
//!
//! Each id type is a thin newtype over an integer, following the same
//! pattern the runtime uses everywhere: a private `AtomicU64` counter behind
//! a `next()` constructor, so ids are unique within one process and stably
//! ordered by creation time (useful for the tie-break rule in strategies:
//! "order by stable op-id").

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a schedulable [`Operation`](crate) — stable, monotonically
/// increasing order.
///
/// `ControlledRuntime` allocates these from a counter scoped to one
/// iteration (reset to zero on every `ControlledRuntime::new`), not from
/// the process-global counter below, so that a recorded trace's ids line
/// up with a replay run's ids as long as both runs create operations in
/// the same order (§4.5, §8 I4). `next()` remains for callers outside the
/// runtime that only need process-wide uniqueness, e.g. standalone tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct OperationId(u64);

impl OperationId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        OperationId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Construct an id from a raw value: used by `ControlledRuntime` to mint
    /// ids from its per-iteration sequence, and by the replay strategy to
    /// reconstruct the ids recorded in a trace.
    pub const fn from_raw(raw: u64) -> Self {
        OperationId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op({})", self.0)
    }
}

/// Identity of a long-lived actor (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        ActorId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor({})", self.0)
    }
}

/// Identity of a controlled task (§3.4). Distinct from [`OperationId`]
/// because a task and the operation that carries it are conceptually
/// separate (a `when_all`/`when_any` combinator creates a task with no
/// operation of its own), even though most tasks have exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        TaskId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task({})", self.0)
    }
}

/// Opaque 128-bit causal grouping id (§3.1 "Group", §6 "Event group wire
/// format"). Propagated from a sending operation to the operations that
/// handle the events it sends, for use by partial-order strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GroupId(u128);

impl GroupId {
    /// `u128` has no stable atomic type, so the 128 bits are split into a
    /// process-wide constant high half (derived from the process start
    /// time) and a monotonically increasing low half. Uniqueness within a
    /// process only requires the low half to be unique.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        static HIGH: AtomicU64 = AtomicU64::new(0);
        let high = match HIGH.load(Ordering::Relaxed) {
            0 => {
                let seed = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0);
                HIGH.store(seed | 1, Ordering::Relaxed);
                seed | 1
            }
            seed => seed,
        };
        let low = COUNTER.fetch_add(1, Ordering::Relaxed);
        GroupId(((high as u128) << 64) | low as u128)
    }

    pub const fn from_raw(raw: u128) -> Self {
        GroupId(raw)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group({:032x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_ordered() {
        let a = OperationId::next();
        let b = OperationId::next();
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn display_formats_are_stable() {
        let id = OperationId::from_raw(7);
        assert_eq!(id.to_string(), "op(7)");
    }

    #[test]
    fn group_id_round_trips_raw() {
        let g = GroupId::from_raw(0xdead_beef);
        assert_eq!(g.as_u128(), 0xdead_beef);
    }
}
