//! Controlled Runtime and Task Controller (C3/C4, §4.1/§4.2): the
//! scheduling-point algorithm, thread-per-operation execution, and the
//! task/actor/synchronization surface built on top of it.
//!
//! [`ControlledRuntime`] is the arbiter; [`task::TaskCtx`] is the handle a
//! spawned operation's body uses to call every controlled primitive from
//! §4.2; [`sync`] holds the RAII synchronization types built on it;
//! [`actor`] wires `weave-actors`' pure dispatch algorithm into the same
//! scheduling-point machinery.

mod actor;
mod runtime;
mod sync;
mod task;

pub use actor::{ActorHandle, Mailbox};
pub use runtime::{ControlledRuntime, IterationOutcome};
pub use sync::{ControlledCondvar, ControlledMutex, ControlledMutexGuard, ControlledSemaphore, SemaphorePermit};
pub use task::{CompletionSource, ControlledTask, InterlockedCell, TaskCtx};
