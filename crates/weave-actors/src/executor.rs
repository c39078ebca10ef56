//! Actor Executor (C5, §4.3): owns one actor's inbox, state stack and
//! pending raise, and implements the inbox-dispatch / handler-execution /
//! state-transition algorithm. Pure and synchronous — no threads, no
//! scheduling points — so it can be unit-tested directly; `weave-runtime`
//! drives one of these per actor from inside a controlled operation and
//! supplies the schedule points around `send`/`dispatch_next`/`receive`.

use rustc_hash::FxHashSet;

use weave_common::ActorId;
use weave_core::EventKind;

use crate::behavior::{ActorBehavior, FailurePolicy};
use crate::event::{Event, Outbox};
use crate::inbox::Inbox;
use crate::transition::Transition;

/// Lifecycle phase (§4.3 "State machine, per actor").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Halting,
    Halted,
}

/// What happened when the executor tried to dispatch one event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// An event was handled; the actor may have more eligible events.
    Handled,
    /// Nothing eligible to dispatch: the inbox is empty, or every event
    /// present is in the current state's defer set.
    Idle,
    /// The actor halted (explicit `Halt`, `FailurePolicy::Halt`, or a
    /// `HaltEvent` handled as such by user code).
    Halted,
    /// A handler reported an exception and `FailurePolicy::ThrowException`
    /// applies; the iteration must end (§7).
    Faulted { message: String },
}

pub struct ActorExecutor<B: ActorBehavior> {
    pub id: ActorId,
    pub name: Option<String>,
    behavior: B,
    inbox: Inbox,
    state_stack: Vec<B::State>,
    pending_raise: Option<Event>,
    outbox: Outbox,
    phase: Phase,
}

impl<B: ActorBehavior> ActorExecutor<B> {
    pub fn new(id: ActorId, name: Option<String>, behavior: B) -> Self {
        let initial = behavior.initial_state();
        ActorExecutor {
            id,
            name,
            behavior,
            inbox: Inbox::new(),
            state_stack: vec![initial],
            pending_raise: None,
            outbox: Outbox::default(),
            phase: Phase::Created,
        }
    }

    /// Read-only access to the user behavior, e.g. for tests asserting on
    /// application-level bookkeeping the handler maintains.
    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn current_state(&self) -> B::State {
        *self
            .state_stack
            .last()
            .expect("an actor's state stack must never be empty")
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.phase, Phase::Halted)
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.len()
    }

    /// Enqueue an event (§3.3). Sending to a halted actor is a no-op here;
    /// the caller (the runtime) is responsible for still creating a
    /// schedule point for it (§3.3 "Sending to a halted actor ... still
    /// creates a schedule point").
    pub fn enqueue(&mut self, event: Event) {
        if self.is_halted() {
            return;
        }
        self.inbox.enqueue(event);
    }

    /// Whether a receive-await filter would be satisfied by what's
    /// currently in the inbox, without consuming anything.
    pub fn has_matching(&self, kinds: &FxHashSet<EventKind>) -> bool {
        self.inbox.iter().any(|e| kinds.contains(&e.kind))
    }

    /// `receive_one` (§4.3 "Receive-await"): consume the first matching
    /// event, if any is already present.
    pub fn try_receive(&mut self, kinds: &FxHashSet<EventKind>) -> Option<Event> {
        self.inbox.dequeue_matching(kinds)
    }

    /// Whether there is an eligible event to dispatch right now, i.e. a
    /// pending raise, or an inbox event not in the current state's defer
    /// set. Used by the runtime to decide whether this actor's `Dequeue`
    /// operation is enabled.
    pub fn has_eligible_event(&self) -> bool {
        if self.pending_raise.is_some() {
            return true;
        }
        let defer = self.behavior.defer_set(self.current_state());
        self.inbox.iter().any(|e| !defer.contains(&e.kind))
    }

    /// Dispatch exactly one event: the pending raise if any (§3.4, §4.3
    /// "raised-beats-inbox"), otherwise the next inbox event not in the
    /// current state's defer/ignore sets.
    pub fn dispatch_next(&mut self) -> DispatchOutcome {
        if self.phase == Phase::Created {
            self.phase = Phase::Running;
            self.behavior.on_entry(self.current_state());
        }
        if self.phase == Phase::Halted {
            return DispatchOutcome::Halted;
        }

        let event = match self.pending_raise.take() {
            Some(raised) => raised,
            None => {
                let state = self.current_state();
                let defer = self.behavior.defer_set(state);
                let ignore = self.behavior.ignore_set(state);
                match self.inbox.dequeue_for_dispatch(&defer, &ignore) {
                    Some(event) => event,
                    None => return DispatchOutcome::Idle,
                }
            }
        };

        let state = self.current_state();
        match self.behavior.handle(state, &event, &mut self.outbox) {
            Ok(transition) => self.apply_transition(transition, event),
            Err(message) => self.apply_failure(message),
        }
    }

    /// Drain the messages a handler queued via `Outbox` during the last
    /// `dispatch_next` call. The runtime calls this right after dispatch so
    /// each queued send is delivered (and its schedule point created)
    /// exactly once.
    pub fn take_pending_sends(&mut self) -> Vec<(ActorId, Event)> {
        self.outbox.take()
    }

    /// The current state's `receive_one` filter, if it has one (§4.3).
    pub fn receive_filter(&self) -> Option<FxHashSet<EventKind>> {
        self.behavior.receive_filter(self.current_state())
    }

    /// `receive_one(kinds)` dispatch: consumes the first inbox event
    /// matching `kinds` wherever it sits, ignoring defer/ignore sets
    /// entirely — same handler-call machinery as `dispatch_next`
    /// otherwise.
    pub fn dispatch_matching(&mut self, kinds: &FxHashSet<EventKind>) -> DispatchOutcome {
        if self.phase == Phase::Created {
            self.phase = Phase::Running;
            self.behavior.on_entry(self.current_state());
        }
        if self.phase == Phase::Halted {
            return DispatchOutcome::Halted;
        }

        let event = match self.pending_raise.take() {
            Some(raised) => raised,
            None => match self.inbox.dequeue_matching(kinds) {
                Some(event) => event,
                None => return DispatchOutcome::Idle,
            },
        };

        let state = self.current_state();
        match self.behavior.handle(state, &event, &mut self.outbox) {
            Ok(transition) => self.apply_transition(transition, event),
            Err(message) => self.apply_failure(message),
        }
    }

    fn apply_failure(&mut self, message: String) -> DispatchOutcome {
        match self.behavior.failure_policy() {
            FailurePolicy::Halt => self.halt(),
            FailurePolicy::HandledException => DispatchOutcome::Handled,
            FailurePolicy::ThrowException => DispatchOutcome::Faulted { message },
        }
    }

    fn apply_transition(&mut self, transition: Transition<B::State>, event: Event) -> DispatchOutcome {
        match transition {
            Transition::Continue => DispatchOutcome::Handled,
            Transition::Raise(raised) => {
                self.pending_raise = Some(raised);
                DispatchOutcome::Handled
            }
            Transition::Goto(next) => {
                let old = self.current_state();
                self.behavior.on_exit(old);
                *self
                    .state_stack
                    .last_mut()
                    .expect("state stack must never be empty") = next;
                self.behavior.on_entry(next);
                DispatchOutcome::Handled
            }
            Transition::Push(next) => {
                let old = self.current_state();
                self.behavior.on_exit(old);
                self.state_stack.push(next);
                self.behavior.on_entry(next);
                DispatchOutcome::Handled
            }
            Transition::Pop => {
                let old = self.current_state();
                self.behavior.on_exit(old);
                self.state_stack.pop();
                assert!(
                    !self.state_stack.is_empty(),
                    "pop underflowed an actor's state stack"
                );
                self.behavior.on_entry(self.current_state());
                // The event that triggered the pop was, by convention,
                // unhandled in the popped state; re-offer it to the
                // restored state (§4.3 "pop restores it and, if an
                // unhandled event was the trigger, it is re-offered to the
                // restored state").
                self.pending_raise = Some(event);
                DispatchOutcome::Handled
            }
            Transition::Halt => self.halt(),
        }
    }

    fn halt(&mut self) -> DispatchOutcome {
        self.phase = Phase::Halting;
        self.behavior.on_halt();
        self.phase = Phase::Halted;
        DispatchOutcome::Halted
    }

    /// Explicit halt request from outside the handler (e.g. a `HaltEvent`
    /// dispatched through `handle` that chose `Transition::Halt`, or a
    /// direct runtime-level halt call).
    pub fn request_halt(&mut self) -> DispatchOutcome {
        self.halt()
    }
}
