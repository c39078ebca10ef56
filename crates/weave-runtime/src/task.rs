//! Task Controller (C4, §4.2): every operation in the §4.2 table as a
//! method on [`TaskCtx`], the handle a spawned operation's body receives.
//!
//! Every method here ends in a call to [`ControlledRuntime::schedule_point`]
//! (or the bool/int equivalents) — "every operation above is a scheduling
//! point" (§4.2). A `TaskCtx` is cheap to clone (it is just an `Arc` and an
//! id) and is `Send`, so it can be moved into the closures `spawn` takes.

use std::sync::Arc;

use parking_lot::Mutex;

use weave_common::{FailureKind, OperationId, TaskId};
use weave_core::{Completion, Owner, ScheduleKind, Status};

use crate::runtime::ControlledRuntime;

/// The handle a controlled operation's body uses to call every primitive
/// in §4.2. Threaded explicitly into every closure rather than read off
/// ambient/thread-local state (Design Notes §9: "the source's ambient
/// access pattern is replaced by parameter passing").
#[derive(Clone)]
pub struct TaskCtx {
    pub(crate) rt: Arc<ControlledRuntime>,
    pub(crate) op: OperationId,
}

type TaskResult<T> = Result<T, FailureKind>;
type Shared<T> = Arc<Mutex<Option<TaskResult<T>>>>;

/// A handle to a spawned task's eventual result (§3.4). `T` must be `Clone`
/// because more than one waiter may `await` the same task (the underlying
/// completion is a single `Result`, not consumed by the first reader).
pub struct ControlledTask<T: Clone + Send + 'static> {
    pub id: TaskId,
    pub(crate) op: OperationId,
    shared: Shared<T>,
}

impl<T: Clone + Send + 'static> Clone for ControlledTask<T> {
    fn clone(&self) -> Self {
        ControlledTask {
            id: self.id,
            op: self.op,
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ControlledTask<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn operation(&self) -> OperationId {
        self.op
    }
}

impl TaskCtx {
    pub(crate) fn new(rt: Arc<ControlledRuntime>, op: OperationId) -> Self {
        TaskCtx { rt, op }
    }

    pub fn operation(&self) -> OperationId {
        self.op
    }

    /// Whether `op` (any operation id this runtime registered — a task or
    /// an actor) has reached a terminal state. Lets a root operation poll
    /// for another operation's completion without holding a typed
    /// `ControlledTask`/`ActorHandle` for it.
    pub fn is_completed(&self, op: OperationId) -> bool {
        self.rt.status_of(op).is_completed()
    }

    /// `spawn(fn) -> task` (§4.2): creates a new operation and a real OS
    /// thread to carry it (§4.1 "physical threads exist, one per
    /// controlled operation"), parked until the strategy first schedules
    /// it. Spawning itself is a `TaskCreate` scheduling point — the caller
    /// may or may not be the next thing that runs.
    #[track_caller]
    pub fn spawn<T, F>(&self, name: impl Into<String>, body: F) -> ControlledTask<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(TaskCtx) -> TaskResult<T> + Send + 'static,
    {
        let rt = self.rt.clone();
        let op = rt.register_operation(name, Owner::Task, Status::Enabled);
        let shared: Shared<T> = Arc::new(Mutex::new(None));
        let shared_for_thread = shared.clone();
        let wg = rt.track_thread();
        let rt_for_thread = rt.clone();
        std::thread::spawn(move || {
            let _wg = wg;
            if rt_for_thread.park_for_first_run(op).is_err() {
                return;
            }
            let ctx = TaskCtx::new(rt_for_thread.clone(), op);
            let result = body(ctx);
            let completion = match &result {
                Ok(_) => Completion::RanToCompletion,
                Err(err) => Completion::Faulted {
                    message: err.to_string(),
                },
            };
            *shared_for_thread.lock() = Some(result);
            rt_for_thread.complete_operation(op, completion);
        });

        // §4.2: "fn runs until first await" — the new operation does not
        // actually execute user code until the scheduler, not this call,
        // chooses it; this schedule point is what makes that choice.
        let _ = self.rt.schedule_point(self.op, ScheduleKind::TaskCreate);

        ControlledTask {
            id: TaskId::next(),
            op,
            shared,
        }
    }

    /// `await(task)` (§4.2): blocks until `task` completes, returning its
    /// value or re-raising the fault/cancellation it completed with.
    #[track_caller]
    pub fn await_task<T: Clone + Send + 'static>(&self, task: &ControlledTask<T>) -> TaskResult<T> {
        if !self.rt.status_of(task.op).is_completed() {
            self.rt.set_status(self.op, Status::BlockedOnOperation(task.op));
        }
        self.rt.schedule_point(self.op, ScheduleKind::ContinueAwait)?;
        self.rt.set_status(self.op, Status::Enabled);

        let slot = task.shared.lock();
        let result = slot
            .clone()
            .expect("an operation completed status implies its result slot was set first");
        match self.rt.status_of(task.op) {
            Status::Completed(Completion::Cancelled) => Err(FailureKind::TaskCancelled),
            Status::Completed(Completion::Faulted { message }) => {
                Err(FailureKind::FaultedTask { message })
            }
            _ => result,
        }
    }

    /// `delay(rounds)` (§4.2): the current operation becomes `Delayed` and
    /// resumes after that many schedule-clock rounds, not wall-clock time
    /// (§3.4). `rounds` is unsigned, so the `NegativeDelay` error from
    /// §4.2's table cannot occur — the type system rules it out rather
    /// than this being an oversight (see `DESIGN.md`).
    #[track_caller]
    pub fn delay(&self, rounds: u32) -> TaskResult<()> {
        if rounds == 0 {
            return self.yield_now();
        }
        self.rt.set_status(self.op, Status::Delayed(rounds));
        self.rt.schedule_point(self.op, ScheduleKind::Delay)?;
        self.rt.set_status(self.op, Status::Enabled);
        Ok(())
    }

    /// `yield_now()` (§4.2): a scheduling point without blocking.
    #[track_caller]
    pub fn yield_now(&self) -> TaskResult<()> {
        self.rt.set_status(self.op, Status::Enabled);
        self.rt.schedule_point(self.op, ScheduleKind::TaskYield)?;
        Ok(())
    }

    /// `when_all(tasks)` (§4.2): completes when every task completes,
    /// propagating the first fault in task order (deterministic — not
    /// whichever happens to fault first in wall-clock terms).
    pub fn when_all<T: Clone + Send + 'static>(
        &self,
        tasks: &[ControlledTask<T>],
    ) -> TaskResult<Vec<T>> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(self.await_task(task)?);
        }
        Ok(results)
    }

    /// `when_any(tasks)` (§4.2): completes when any task completes,
    /// choosing among the ones already complete via the exploration
    /// strategy's `choose_int` when more than one raced to finish first.
    pub fn when_any<T: Clone + Send + 'static>(
        &self,
        tasks: &[ControlledTask<T>],
    ) -> TaskResult<(usize, T)> {
        assert!(!tasks.is_empty(), "when_any requires at least one task");
        loop {
            let ready: Vec<usize> = tasks
                .iter()
                .enumerate()
                .filter(|(_, t)| self.rt.status_of(t.op).is_completed())
                .map(|(i, _)| i)
                .collect();
            if !ready.is_empty() {
                let idx = if ready.len() == 1 {
                    ready[0]
                } else {
                    let pick = self.rt.choose_int(self.op, (ready.len() - 1) as u64, ScheduleKind::RandomInt)?;
                    ready[pick as usize]
                };
                let value = self.await_task(&tasks[idx])?;
                return Ok((idx, value));
            }
            self.yield_now()?;
        }
    }

    /// `random_bool()` / `Random-Bool` schedule point (§3.2).
    #[track_caller]
    pub fn random_bool(&self) -> TaskResult<bool> {
        self.rt.choose_bool(self.op, ScheduleKind::RandomBool)
    }

    /// `random_int(upper)` / `Random-Int(range)` schedule point (§3.2);
    /// result is in `0..=upper`.
    #[track_caller]
    pub fn random_int(&self, upper: u64) -> TaskResult<u64> {
        self.rt.choose_int(self.op, upper, ScheduleKind::RandomInt)
    }

    /// The assertion API (§7 "Programmer-visible assertion failure").
    #[track_caller]
    pub fn assert(&self, condition: bool, message: impl Into<String>) -> TaskResult<()> {
        self.rt.assert(self.op, condition, message)
    }

    #[track_caller]
    pub fn lock(&self, mutex: &Arc<crate::sync::ControlledMutex>) -> TaskResult<crate::sync::ControlledMutexGuard> {
        crate::sync::ControlledMutex::lock(mutex, self)
    }

    /// `monitor(event)` (§4.6): notify every registered spec monitor.
    /// Purely observational, never a scheduling point.
    pub fn monitor(&self, event: weave_actors::Event) {
        self.rt.observe_monitors(&event);
    }
}

/// `interlocked_rmw(loc, f)` (§4.2): a memory cell that is atomic with
/// respect to other controlled operations, but whose read-modify-write is
/// still a schedule point (the point at which another operation's
/// conflicting RMW could have been interleaved, had the strategy chosen
/// differently).
pub struct InterlockedCell<T> {
    handle: weave_core::ResourceHandle,
    value: Mutex<T>,
}

impl<T: Clone + Send + 'static> InterlockedCell<T> {
    pub fn new(initial: T) -> Self {
        InterlockedCell {
            handle: weave_core::ResourceHandle::next(),
            value: Mutex::new(initial),
        }
    }

    pub fn load(&self) -> T {
        self.value.lock().clone()
    }

    #[track_caller]
    pub fn rmw(&self, ctx: &TaskCtx, f: impl FnOnce(T) -> T) -> Result<T, FailureKind> {
        let mut guard = self.value.lock();
        let updated = f(guard.clone());
        *guard = updated.clone();
        drop(guard);
        ctx.rt.note_resource_access(crate::runtime::resource_tag::handle(self.handle), ctx.op);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Interlocked)?;
        Ok(updated)
    }
}

/// `completion_source::set_result(v)` (§4.2): a task with no backing
/// operation thread of its own. Registered as an operation that starts
/// `Blocked-on-Resource` on a handle only `set_result` itself ever
/// satisfies — so if nothing ever calls `set_result` and every other
/// operation quiesces, that is correctly reported as a deadlock (§4.1 step
/// 3), not silently ignored.
pub struct CompletionSource<T: Clone + Send + 'static> {
    op: OperationId,
    shared: Shared<T>,
}

impl<T: Clone + Send + 'static> CompletionSource<T> {
    #[track_caller]
    pub fn new(ctx: &TaskCtx, name: impl Into<String>) -> Self {
        let guard_handle = weave_core::ResourceHandle::next();
        let op = ctx
            .rt
            .register_operation(name, Owner::Task, Status::BlockedOnResource(guard_handle));
        CompletionSource {
            op,
            shared: Arc::new(Mutex::new(None)),
        }
    }

    /// A task handle observers can `await`, already linked to this source's
    /// completion.
    pub fn task(&self) -> ControlledTask<T> {
        ControlledTask {
            id: TaskId::next(),
            op: self.op,
            shared: self.shared.clone(),
        }
    }

    /// Ready the underlying task. Creates a schedule point (§4.2) so a
    /// waiter may observe the result before or after other operations run,
    /// exactly like any other controlled primitive.
    #[track_caller]
    pub fn set_result(&self, ctx: &TaskCtx, value: T) -> Result<(), FailureKind> {
        {
            let mut guard = self.shared.lock();
            if guard.is_some() {
                return Err(FailureKind::AlreadyCompleted);
            }
            *guard = Some(Ok(value));
        }
        ctx.rt.complete_operation(self.op, Completion::RanToCompletion);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Interlocked)?;
        Ok(())
    }
}
