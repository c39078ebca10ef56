//! Actor surface (C5, §3.3/§4.3) wired into the scheduling-point algorithm:
//! one OS thread per actor, same execution model as `task::TaskCtx::spawn`
//! (§4.1 "physical threads exist, one per controlled operation"). The
//! thread repeatedly checks eligibility, asks the scheduler for a
//! `Dequeue`/`Receive` point, and runs one step of `ActorExecutor`'s pure
//! dispatch algorithm. Messages a handler queues through `Outbox` are
//! delivered, each with its own `Send` schedule point, once the handler
//! returns — `weave-actors` itself never touches a schedule point (§9:
//! "handlers stay pure step functions").

use std::sync::Arc;

use parking_lot::Mutex as PlMutex;

use weave_actors::{ActorBehavior, ActorExecutor, DispatchOutcome, Event};
use weave_common::{ActorId, FailureKind, OperationId};
use weave_core::{Completion, EventKind, Owner, ResourceHandle, ScheduleKind, Status};

use crate::runtime::ControlledRuntime;
use crate::task::TaskCtx;

/// A type-erased, cloneable handle for enqueuing events into one actor,
/// independent of its concrete `ActorBehavior::State` type — what a sender
/// needs to address an actor without holding a typed `ActorHandle<B>`.
#[derive(Clone)]
pub struct Mailbox {
    id: ActorId,
    inbox_handle: ResourceHandle,
    enqueue: Arc<dyn Fn(Event) + Send + Sync>,
    rt: Arc<ControlledRuntime>,
}

impl Mailbox {
    pub fn id(&self) -> ActorId {
        self.id
    }

    fn deliver(&self, event: Event) {
        let kind = event.kind.clone();
        (self.enqueue)(event);
        self.rt.wake_resource_waiters(self.inbox_handle);
        self.rt.wake_receivers(&kind);
    }

    /// `send(actor, event)` (§3.3, §4.2): enqueue `event` and create a
    /// `Send` schedule point for the caller. Sending to a halted actor is
    /// a silent no-op at the inbox level (`ActorExecutor::enqueue`'s own
    /// rule, §3.3), but it is still a schedule point here, per that same
    /// section.
    #[track_caller]
    pub fn send(&self, ctx: &TaskCtx, event: Event) -> Result<(), FailureKind> {
        self.deliver(event);
        ctx.rt.note_resource_access(crate::runtime::resource_tag::actor(self.id), ctx.op);
        ctx.rt.schedule_point(ctx.op, ScheduleKind::Send)?;
        Ok(())
    }
}

/// Owns one actor's [`ActorExecutor`] and the dispatch-loop thread driving
/// it. The executor itself is `Mutex`-guarded even though only one
/// operation ever touches it at a time (the scheduler serializes access
/// across the whole process); the lock exists so `Mailbox::enqueue` — called
/// from whichever other operation's thread happens to be running — can
/// reach the inbox without its own schedule point.
pub struct ActorHandle<B: ActorBehavior + 'static> {
    pub id: ActorId,
    op: OperationId,
    executor: Arc<PlMutex<ActorExecutor<B>>>,
    mailbox: Mailbox,
}

impl<B: ActorBehavior + 'static> Clone for ActorHandle<B> {
    fn clone(&self) -> Self {
        ActorHandle {
            id: self.id,
            op: self.op,
            executor: self.executor.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<B: ActorBehavior + 'static> ActorHandle<B> {
    /// Spawn a new actor: registers its operation and mailbox, and starts
    /// its dispatch thread parked for first run, same convention as
    /// `TaskCtx::spawn`.
    #[track_caller]
    pub fn spawn(ctx: &TaskCtx, name: impl Into<String>, behavior: B) -> ActorHandle<B> {
        let id = ActorId::next();
        let rt = ctx.rt.clone();
        let op = rt.register_operation(name, Owner::Actor(id), Status::Enabled);
        let executor = Arc::new(PlMutex::new(ActorExecutor::new(id, None, behavior)));
        let inbox_handle = ResourceHandle::next();

        let enqueue_executor = executor.clone();
        let enqueue: Arc<dyn Fn(Event) + Send + Sync> = Arc::new(move |event: Event| {
            enqueue_executor.lock().enqueue(event);
        });
        let mailbox = Mailbox {
            id,
            inbox_handle,
            enqueue,
            rt: rt.clone(),
        };
        rt.register_mailbox(id, mailbox.clone());

        let wg = rt.track_thread();
        let rt_for_thread = rt.clone();
        let executor_for_thread = executor.clone();
        std::thread::spawn(move || {
            let _wg = wg;
            if rt_for_thread.park_for_first_run(op).is_err() {
                return;
            }
            run_dispatch_loop(rt_for_thread, id, op, inbox_handle, executor_for_thread);
        });

        let _ = ctx.rt.schedule_point(ctx.op, ScheduleKind::TaskCreate);

        ActorHandle { id, op, executor, mailbox }
    }

    pub fn operation(&self) -> OperationId {
        self.op
    }

    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    #[track_caller]
    pub fn send(&self, ctx: &TaskCtx, event: Event) -> Result<(), FailureKind> {
        self.mailbox.send(ctx, event)
    }

    /// Read-only access to the behavior, e.g. for assertions in a test
    /// once the actor has halted or the iteration has otherwise quiesced.
    pub fn inspect<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(self.executor.lock().behavior())
    }

    /// How many events remain unread in this actor's inbox. Used by tests
    /// asserting quiescence (§8 scenario 3: "server's inbox contains no
    /// unread events").
    pub fn inbox_len(&self) -> usize {
        self.executor.lock().inbox_len()
    }
}

/// One actor's lifetime on its own thread: alternate between a scheduling
/// point (`Dequeue` for ordinary dispatch, `Receive` while a state has an
/// active `receive_one` filter, §4.3) and one step of the pure dispatch
/// algorithm, until the actor halts or the iteration ends.
fn run_dispatch_loop<B: ActorBehavior + 'static>(
    rt: Arc<ControlledRuntime>,
    self_id: ActorId,
    op: OperationId,
    inbox_handle: ResourceHandle,
    executor: Arc<PlMutex<ActorExecutor<B>>>,
) {
    loop {
        let filter = executor.lock().receive_filter();
        let eligible = match &filter {
            Some(kinds) => executor.lock().has_matching(kinds),
            None => executor.lock().has_eligible_event(),
        };
        if eligible {
            rt.set_status(op, Status::Enabled);
        } else if let Some(kinds) = &filter {
            let kinds: std::collections::HashSet<EventKind> = kinds.iter().cloned().collect();
            rt.set_status(op, Status::BlockedOnReceive(kinds));
        } else {
            rt.set_status(op, Status::BlockedOnResource(inbox_handle));
        }

        let point_kind = if filter.is_some() {
            ScheduleKind::Receive
        } else {
            ScheduleKind::Dequeue
        };
        if let Err(err) = rt.schedule_point(op, point_kind) {
            rt.complete_operation(op, Completion::Faulted { message: err.to_string() });
            return;
        }
        rt.set_status(op, Status::Enabled);

        let outcome = match &filter {
            Some(kinds) => executor.lock().dispatch_matching(kinds),
            None => executor.lock().dispatch_next(),
        };

        match outcome {
            DispatchOutcome::Handled => {
                let sends = executor.lock().take_pending_sends();
                for (target, event) in sends {
                    if let Some(mailbox) = rt.mailbox(target) {
                        mailbox.deliver(event);
                    }
                    // A handler sending to itself just enqueues; it doesn't
                    // yield the baton or create a DPOR dependency (§4.1).
                    if target == self_id {
                        continue;
                    }
                    rt.note_resource_access(crate::runtime::resource_tag::actor(target), op);
                    if let Err(err) = rt.schedule_point(op, ScheduleKind::Send) {
                        rt.complete_operation(op, Completion::Faulted { message: err.to_string() });
                        return;
                    }
                }
            }
            DispatchOutcome::Idle => {}
            DispatchOutcome::Halted => {
                rt.complete_operation(op, Completion::RanToCompletion);
                return;
            }
            DispatchOutcome::Faulted { message } => {
                let err = FailureKind::UnhandledException {
                    actor: op.to_string(),
                    message,
                };
                // Abort before marking the operation complete: completion
                // now hands off the scheduler baton, which must not happen
                // once this iteration has failed.
                let err = rt.abort_with(err);
                rt.complete_operation(op, Completion::Faulted { message: err.to_string() });
                return;
            }
        }
    }
}
