//! Operation (C1, §3.1): the unit of schedulable concurrency.

use std::collections::HashSet;
use std::panic::Location;

use weave_common::{ActorId, GroupId, OperationId};

use crate::event::{EventKind, ResourceHandle};
use crate::point::ScheduleKind;

/// The owner of an operation: an actor's current handler, or an anonymous
/// controlled task (§3.1 "Owner").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Actor(ActorId),
    Task,
}

/// The completion disposition of an operation that has reached the
/// `Completed` status (§3.1, §3.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    RanToCompletion,
    Faulted { message: String },
    Cancelled,
}

/// The status set from §3.1, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Not yet scheduled for the first time.
    None,
    /// Eligible to run right now.
    Enabled,
    /// Waiting for another operation to reach a terminal state.
    BlockedOnOperation(OperationId),
    /// Waiting to acquire/observe a shared resource.
    BlockedOnResource(ResourceHandle),
    /// Waiting in `receive_one` for one of a set of event kinds.
    BlockedOnReceive(HashSet<EventKind>),
    /// Will become enabled after this many more schedule-clock rounds.
    Delayed(u32),
    /// Terminal.
    Completed(Completion),
}

impl Status {
    /// Whether this status counts toward the "enabled set" E in §4.1 step 2.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Status::Enabled)
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self, Status::Delayed(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Status::Completed(_))
    }

    /// Decrement a `Delayed` status by `rounds`, saturating at zero and
    /// flipping to `Enabled` once it reaches zero (§4.1 step 4).
    pub fn tick_delay(&mut self, rounds: u32) {
        if let Status::Delayed(remaining) = self {
            let left = remaining.saturating_sub(rounds);
            if left == 0 {
                *self = Status::Enabled;
            } else {
                *remaining = left;
            }
        }
    }
}

/// Debug info captured at the most recent scheduling point (§3.1 "Debug
/// info"). `source` is captured automatically via `#[track_caller]` at the
/// controlled-primitive call site, so user code needs no instrumentation.
#[derive(Debug, Clone)]
pub struct DebugInfo {
    pub last_point_kind: Option<ScheduleKind>,
    pub source_file: &'static str,
    pub source_line: u32,
}

impl DebugInfo {
    #[track_caller]
    pub fn here() -> Self {
        let loc = Location::caller();
        DebugInfo {
            last_point_kind: None,
            source_file: loc.file(),
            source_line: loc.line(),
        }
    }
}

/// The schedulable unit itself (§3.1).
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    pub owner: Owner,
    pub group: Option<GroupId>,
    pub status: Status,
    pub debug: DebugInfo,
}

impl Operation {
    /// Allocates a fresh, process-global id. Only suitable for callers that
    /// don't need that id to be reproducible across runs — the controlled
    /// runtime itself allocates ids from its own per-iteration sequence via
    /// [`Operation::with_id`] instead (see `ControlledRuntime::register_operation`).
    #[track_caller]
    pub fn new(name: impl Into<String>, owner: Owner) -> Self {
        Operation::with_id(OperationId::next(), name, owner)
    }

    #[track_caller]
    pub fn with_id(id: OperationId, name: impl Into<String>, owner: Owner) -> Self {
        Operation {
            id,
            name: name.into(),
            owner,
            group: None,
            status: Status::None,
            debug: DebugInfo::here(),
        }
    }

    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// A short, human-readable name for deadlock/liveness messages
    /// ("{names} are waiting …", §7). Falls back to the id if no name was
    /// given at spawn time.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_ticks_down_to_enabled() {
        let mut s = Status::Delayed(3);
        s.tick_delay(1);
        assert_eq!(s, Status::Delayed(2));
        s.tick_delay(2);
        assert_eq!(s, Status::Enabled);
    }

    #[test]
    fn delay_never_goes_negative() {
        let mut s = Status::Delayed(2);
        s.tick_delay(10);
        assert_eq!(s, Status::Enabled);
    }

    #[test]
    fn only_enabled_status_counts_as_enabled() {
        assert!(Status::Enabled.is_enabled());
        assert!(!Status::Delayed(1).is_enabled());
        assert!(!Status::Completed(Completion::RanToCompletion).is_enabled());
    }

    #[test]
    fn unnamed_operation_displays_its_id() {
        let op = Operation::new("", Owner::Task);
        assert_eq!(op.display_name(), op.id.to_string());
    }
}
