//! `ControlledMutex` / `ControlledCondvar` / `ControlledSemaphore`
//! (§4.2 table and additions): concrete, reusable RAII
//! synchronization primitives built on the scheduling-point algorithm,
//! instead of bare `lock(mutex)`/`unlock(mutex)` free functions — idiomatic
//! Rust favors a guard whose `Drop` releases the resource over a call the
//! programmer must remember to balance. `ControlledMutexGuard`'s `Drop`
//! still goes through the same `Unlock` schedule point an explicit unlock
//! would (§4.2), so the contract is unchanged; it is just structurally
//! impossible to unbalance, which is why there is no `UnbalancedUnlock`
//! error path here (see `DESIGN.md`).

use std::sync::Arc;

use parking_lot::Mutex as PlMutex;

use weave_common::OperationId;
use weave_common::FailureKind;
use weave_core::{ResourceHandle, ScheduleKind, Status};

use crate::runtime::ControlledRuntime;
use crate::task::TaskCtx;

struct MutexState {
    owner: Option<OperationId>,
    depth: u32,
}

/// A reentrant lock whose acquire/release are scheduling points (§4.2
/// "reentrant on same op; fairness is strategy-chosen").
pub struct ControlledMutex {
    handle: ResourceHandle,
    state: PlMutex<MutexState>,
}

impl Default for ControlledMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlledMutex {
    pub fn new() -> Self {
        ControlledMutex {
            handle: ResourceHandle::next(),
            state: PlMutex::new(MutexState { owner: None, depth: 0 }),
        }
    }

    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    /// Try to acquire without blocking; `true` means the caller now holds
    /// it (freshly or reentrantly).
    fn try_acquire(&self, op: OperationId) -> bool {
        let mut state = self.state.lock();
        if state.owner.is_none() || state.owner == Some(op) {
            state.owner = Some(op);
            state.depth += 1;
            true
        } else {
            false
        }
    }

    /// Release one level of reentrancy; returns `true` once the lock is
    /// fully released (depth reached zero).
    fn release(&self, op: OperationId) -> bool {
        let mut state = self.state.lock();
        assert_eq!(state.owner, Some(op), "unlock by an operation that does not hold the lock");
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            true
        } else {
            false
        }
    }

    /// `lock(mutex)` (§4.2). Every attempt — whether it acquires
    /// immediately or blocks first — passes through a `Lock` schedule
    /// point, so the strategy always gets a chance to interleave here.
    #[track_caller]
    pub fn lock(this: &Arc<Self>, ctx: &TaskCtx) -> Result<ControlledMutexGuard, FailureKind> {
        loop {
            if this.try_acquire(ctx.op) {
                ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(this.handle), ctx.op);
                ctx.rt.schedule_point(ctx.op, ScheduleKind::Lock)?;
                return Ok(ControlledMutexGuard {
                    rt: ctx.rt.clone(),
                    op: ctx.op,
                    mutex: this.clone(),
                });
            }
            ctx.rt.set_status(ctx.op, Status::BlockedOnResource(this.handle));
            ctx.rt.schedule_point(ctx.op, ScheduleKind::Lock)?;
            ctx.rt.set_status(ctx.op, Status::Enabled);
        }
    }
}

/// RAII guard for a held [`ControlledMutex`]. Dropping it unlocks — still a
/// schedule point (§4.2), exactly as if `unlock(mutex)` had been called
/// explicitly.
pub struct ControlledMutexGuard {
    rt: Arc<ControlledRuntime>,
    op: OperationId,
    mutex: Arc<ControlledMutex>,
}

impl Drop for ControlledMutexGuard {
    fn drop(&mut self) {
        let fully_released = self.mutex.release(self.op);
        if fully_released {
            self.rt.wake_resource_waiters(self.mutex.handle);
        }
        self.rt.note_resource_access(crate::runtime::resource_tag::handle(self.mutex.handle), self.op);
        let _ = self.rt.schedule_point(self.op, ScheduleKind::Unlock);
    }
}

/// `wait(cond)` / `pulse(cond)` / `pulse_all(cond)` (§4.2): a classical
/// monitor condition. `wait` takes the guard by value as proof the caller
/// holds the associated lock — `InvalidWaitState` from §4.2's error column
/// cannot arise here for the same reason `UnbalancedUnlock` cannot: the
/// borrow checker enforces it instead of a runtime check.
pub struct ControlledCondvar {
    handle: ResourceHandle,
}

impl Default for ControlledCondvar {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlledCondvar {
    pub fn new() -> Self {
        ControlledCondvar {
            handle: ResourceHandle::next(),
        }
    }

    /// Release `guard`'s lock, block until pulsed, then reacquire the same
    /// mutex before returning a fresh guard for it.
    #[track_caller]
    pub fn wait(&self, ctx: &TaskCtx, guard: ControlledMutexGuard) -> Result<ControlledMutexGuard, FailureKind> {
        let mutex = guard.mutex.clone();
        drop(guard);
        ctx.rt.set_status(ctx.op, Status::BlockedOnResource(self.handle));
        ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(self.handle), ctx.op);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Wait)?;
        ctx.rt.set_status(ctx.op, Status::Enabled);
        ControlledMutex::lock(&mutex, ctx)
    }

    /// Wake exactly one waiter (§4.2 `pulse`).
    #[track_caller]
    pub fn pulse(&self, ctx: &TaskCtx) -> Result<(), FailureKind> {
        ctx.rt.wake_one_resource_waiter(self.handle);
        ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(self.handle), ctx.op);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Pulse)?;
        Ok(())
    }

    /// Wake every waiter (§4.2 `pulse_all`).
    #[track_caller]
    pub fn pulse_all(&self, ctx: &TaskCtx) -> Result<(), FailureKind> {
        ctx.rt.wake_resource_waiters(self.handle);
        ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(self.handle), ctx.op);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Pulse)?;
        Ok(())
    }
}

/// A counting semaphore (§4.2 addition: "the source system being
/// modeled here exposes a counting semaphore alongside lock/monitor and
/// interlocked primitives"). Acquire blocks like `lock`; release behaves
/// like `pulse` against the waiters on the same handle.
pub struct ControlledSemaphore {
    handle: ResourceHandle,
    permits: PlMutex<u32>,
}

impl ControlledSemaphore {
    pub fn new(permits: u32) -> Self {
        ControlledSemaphore {
            handle: ResourceHandle::next(),
            permits: PlMutex::new(permits),
        }
    }

    #[track_caller]
    pub fn acquire(this: &Arc<Self>, ctx: &TaskCtx) -> Result<SemaphorePermit, FailureKind> {
        loop {
            {
                let mut permits = this.permits.lock();
                if *permits > 0 {
                    *permits -= 1;
                    drop(permits);
                    ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(this.handle), ctx.op);
                    ctx.rt.schedule_point(ctx.op, ScheduleKind::Lock)?;
                    return Ok(SemaphorePermit {
                        rt: ctx.rt.clone(),
                        op: ctx.op,
                        sem: this.clone(),
                    });
                }
            }
            ctx.rt.set_status(ctx.op, Status::BlockedOnResource(this.handle));
            ctx.rt.schedule_point(ctx.op, ScheduleKind::Lock)?;
            ctx.rt.set_status(ctx.op, Status::Enabled);
        }
    }
}

/// A held semaphore permit; dropping it releases one unit back.
pub struct SemaphorePermit {
    rt: Arc<ControlledRuntime>,
    op: OperationId,
    sem: Arc<ControlledSemaphore>,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        *self.sem.permits.lock() += 1;
        self.rt.wake_resource_waiters(self.sem.handle);
        self.rt.note_resource_access(crate::runtime::resource_tag::handle(self.sem.handle), self.op);
        let _ = self.rt.schedule_point(self.op, ScheduleKind::Unlock);
    }
}
