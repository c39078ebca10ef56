//! `weave`: the public facade over the controlled-concurrency testing
//! engine (§1 "the core covered here"). Re-exports the surface a user
//! program needs — `TaskCtx`, `ActorHandle`, the synchronization
//! primitives, the actor behavior contract, spec monitors — and adds
//! [`Engine`], the iteration loop external drivers (out of core scope per
//! §1, §6) are expected to embed: build a strategy from `Config`, run
//! iterations until a bug is found or the budget is exhausted, and persist
//! a failing iteration's reproduction trace.

pub use weave_actors::{ActorBehavior, DispatchOutcome, Event, FailurePolicy, Outbox, Phase, Transition};
pub use weave_common::{ActorId, Config, ExitCode, FailureKind, GroupId, Logger, OperationId, StrategyKind, TaskId};
pub use weave_core::{Completion, EventKind, ResourceHandle, ScheduleKind, SchedulePoint, Status};
pub use weave_monitor::{MonitorSet, ObservingMonitor, SpecMonitor, TypedMonitor};
pub use weave_runtime::{
    ActorHandle, CompletionSource, ControlledCondvar, ControlledMutex, ControlledMutexGuard, ControlledRuntime,
    ControlledSemaphore, ControlledTask, InterlockedCell, IterationOutcome, Mailbox, SemaphorePermit, TaskCtx,
};
pub use weave_strategy::{
    from_kind, DfsStrategy, DporStrategy, ExplorationStrategy, FairStrategy, PriorityStrategy, ProbabilisticStrategy,
    RandomStrategy, ReplayStrategy,
};
pub use weave_trace::{Trace, TraceEntry, TraceError, TraceValue};

use std::sync::Arc;

use parking_lot::Mutex;

/// One completed call to [`Engine::run`]: how many iterations actually ran,
/// the first failing iteration's outcome (if any), and the exit code an
/// external driver should use (§6 "CLI surface").
pub struct EngineOutcome {
    pub iterations_run: u32,
    pub failing: Option<IterationOutcome>,
    pub exit_code: ExitCode,
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        self.failing.is_none()
    }
}

/// Drives the controlled runtime across a budget of test iterations (§6
/// `iterations`), building the configured exploration strategy once and
/// reusing it across iterations so stateful strategies (DFS, DPOR) can
/// actually make progress through their decision tree from one iteration
/// to the next. Everything an external CLI driver (out of core scope, §1)
/// would otherwise have to wire up by hand: strategy construction from
/// `Config::strategy`, the per-iteration `ControlledRuntime`, replay's
/// trace-file load, and a failing iteration's trace-file write (§7 "a
/// failing iteration writes its reproduction trace").
pub struct Engine {
    config: Config,
    logger: Arc<Logger>,
}

impl Engine {
    /// Rejects an invalid `Config` up front (§7 `ConfigurationError`) so a
    /// caller never starts iterating against one that cannot possibly run.
    pub fn new(config: Config) -> Result<Self, FailureKind> {
        config.validate()?;
        let logger = Arc::new(Logger::new(config.verbose));
        Ok(Engine { config, logger })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    fn build_strategy(&self) -> Result<Box<dyn ExplorationStrategy>, FailureKind> {
        if self.config.strategy == StrategyKind::Replay {
            let path = self
                .config
                .trace_path
                .as_ref()
                .expect("Config::validate rejects strategy=replay without trace_path");
            let text = std::fs::read_to_string(path).map_err(|e| FailureKind::ConfigurationError {
                detail: format!("could not read trace_path {}: {e}", path.display()),
            })?;
            let trace = Trace::parse(&text).map_err(|e| FailureKind::ConfigurationError {
                detail: format!("could not parse trace at {}: {e}", path.display()),
            })?;
            Ok(Box::new(ReplayStrategy::new(trace)))
        } else {
            Ok(from_kind(self.config.strategy, self.config.seed))
        }
    }

    /// Run the program up to `Config::iterations` times, or until a bug is
    /// found, or until the strategy reports it has nothing further to
    /// explore (§3.5 `prepare_next_iteration`). `body_factory` is called
    /// once per iteration to build the root operation's closure (it cannot
    /// be `Clone` in general since it typically captures iteration-local
    /// state); `monitors_factory` likewise builds a fresh [`MonitorSet`]
    /// per iteration.
    pub fn run<B, FB, FM>(&self, mut body_factory: FB, mut monitors_factory: FM) -> Result<EngineOutcome, FailureKind>
    where
        B: FnOnce(TaskCtx) -> Result<(), FailureKind> + Send + 'static,
        FB: FnMut() -> B,
        FM: FnMut() -> MonitorSet,
    {
        let strategy: Arc<Mutex<Box<dyn ExplorationStrategy>>> = Arc::new(Mutex::new(self.build_strategy()?));

        let mut iterations_run = 0u32;
        let mut failing = None;
        loop {
            iterations_run += 1;
            let rt = ControlledRuntime::new(self.config.clone(), strategy.clone(), monitors_factory(), self.logger.clone());
            let outcome = rt.run_iteration(body_factory());

            if outcome.result.is_err() {
                if let Some(path) = &self.config.trace_path {
                    // §7 "A failing iteration writes its reproduction trace."
                    // Best-effort: a write failure here must not mask the
                    // bug the iteration already found.
                    let _ = std::fs::write(path, outcome.trace.render());
                }
                failing = Some(outcome);
                break;
            }

            let has_more = strategy.lock().prepare_next_iteration();
            if iterations_run >= self.config.iterations || !has_more {
                break;
            }
        }

        let exit_code = failing
            .as_ref()
            .map(|o| o.result.as_ref().unwrap_err().exit_code())
            .unwrap_or(ExitCode::Success);

        Ok(EngineOutcome {
            iterations_run,
            failing,
            exit_code,
        })
    }

    /// Convenience for programs that don't register any spec monitors.
    pub fn run_unmonitored<B, FB>(&self, body_factory: FB) -> Result<EngineOutcome, FailureKind>
    where
        B: FnOnce(TaskCtx) -> Result<(), FailureKind> + Send + 'static,
        FB: FnMut() -> B,
    {
        self.run(body_factory, MonitorSet::new)
    }
}
