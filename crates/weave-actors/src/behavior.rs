//! The actor type contract: a closed state type, a handler table, and the
//! per-state defer/ignore sets (§3.3 "Handler table", Design Notes §9
//! "Handler registration by reflection ... is replaced by a compile-time
//! registry").

use rustc_hash::FxHashSet;

use weave_core::EventKind;

use crate::event::{Event, Outbox};
use crate::transition::Transition;

/// What happens to an actor when a handler reports an exception (§4.3
/// "Failure semantics", §7 "Unhandled exception in handler").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Halt the actor, as if it had called `Halt` itself.
    Halt,
    /// Swallow the exception and keep dispatching.
    HandledException,
    /// Propagate to the runtime's `on_failure` and end the iteration.
    ThrowException,
}

/// User-implemented actor type (§3.3). `S` is the closed sum type of
/// states — an enum with `Copy + Eq + Hash` — looked up bottom-up through
/// the state stack when finding a handler (Design Notes §9 "State
/// inheritance / pushed states become an explicit stack of state values").
pub trait ActorBehavior: Send {
    type State: Copy + Eq + std::hash::Hash + Send + std::fmt::Debug + 'static;

    fn initial_state(&self) -> Self::State;

    /// Handle one event in `state`. Returning `Err` signals an application
    /// exception (§4.3), resolved according to [`ActorBehavior::failure_policy`].
    /// Any message the handler wants delivered to another actor goes through
    /// `outbox` rather than a direct call, keeping this step pure.
    fn handle(
        &mut self,
        state: Self::State,
        event: &Event,
        outbox: &mut Outbox,
    ) -> Result<Transition<Self::State>, String>;

    fn on_entry(&mut self, _state: Self::State) {}
    fn on_exit(&mut self, _state: Self::State) {}
    fn on_halt(&mut self) {}

    fn defer_set(&self, _state: Self::State) -> FxHashSet<EventKind> {
        FxHashSet::default()
    }

    fn ignore_set(&self, _state: Self::State) -> FxHashSet<EventKind> {
        FxHashSet::default()
    }

    /// `receive_one({E1,E2,...})` (§4.3 "Receive-await"): when `Some`, this
    /// state only ever dequeues an event whose kind is in the returned set
    /// — everything else in the inbox is left untouched, bypassing the
    /// ordinary defer/ignore dequeue for as long as the state returns a
    /// filter. `None` (the default) is ordinary dispatch.
    fn receive_filter(&self, _state: Self::State) -> Option<FxHashSet<EventKind>> {
        None
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Halt
    }
}
