//! The tagged continuation value a handler returns instead of using
//! exception-based control flow for raise/goto/push/pop/halt (Design Notes
//! §9: "Exception-based control flow ... is modelled as a tagged
//! continuation value returned by handlers").

use crate::event::Event;

/// What an actor handler wants to happen next (§4.3, §9).
pub enum Transition<S> {
    /// Nothing special; dispatch moves on to the next eligible event.
    Continue,
    /// Raise an event that preempts the inbox on the next dispatch cycle
    /// (§3.4 "Pending raise", §4.3 "raised-beats-inbox").
    Raise(Event),
    /// Replace the current state with `S`: `OnExit` of the old state runs,
    /// then `OnEntry` of `S` (§4.3 `goto`).
    Goto(S),
    /// Push `S` on top of the state stack, keeping the old state
    /// underneath it (§4.3 `push`).
    Push(S),
    /// Pop the state stack, restoring the state beneath (§4.3 `pop`). If
    /// the triggering event was the reason for the pop, it is re-offered
    /// to the restored state on the next dispatch.
    Pop,
    /// Halt the actor: `OnHalt` runs, then the actor drops further events
    /// silently (§3.3 "Halted flag").
    Halt,
}

impl<S> std::fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transition::Continue => "Continue",
            Transition::Raise(_) => "Raise",
            Transition::Goto(_) => "Goto",
            Transition::Push(_) => "Push",
            Transition::Pop => "Pop",
            Transition::Halt => "Halt",
        };
        f.write_str(name)
    }
}
