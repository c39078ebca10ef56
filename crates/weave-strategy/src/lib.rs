//! Exploration strategies (C2): the pluggable policies that resolve every
//! scheduling choice and every boolean/integer nondeterministic choice.
//!
//! All variants implement [`ExplorationStrategy`]. The three required
//! decision methods return `Result` rather than bare values — `ReplayStrategy`
//! is the only variant that can fail mid-choice (a recorded trace entry of
//! the wrong kind is a `TraceMismatch`), but giving every strategy the same
//! fallible signature means the runtime has one call site instead of two.

pub mod dfs;
pub mod dpor;
pub mod fair;
pub mod priority;
pub mod probabilistic;
pub mod random;
pub mod replay;

pub use dfs::DfsStrategy;
pub use dpor::DporStrategy;
pub use fair::FairStrategy;
pub use priority::PriorityStrategy;
pub use probabilistic::ProbabilisticStrategy;
pub use random::RandomStrategy;
pub use replay::ReplayStrategy;

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind, SchedulePoint};

/// A pluggable policy resolving every scheduling choice (C2, §4.4).
///
/// Tie-breaks are the caller's responsibility to request consistently: all
/// strategies here order the enabled set by stable operation id before
/// weighting it, so "equal weight" ties resolve to the lowest id.
///
/// Every decision method takes the [`ScheduleKind`] of the point being
/// resolved. Most strategies ignore it; [`ReplayStrategy`] uses it to
/// detect a `TraceMismatch` (§7): the recorded trace is an ordered sequence
/// of `(kind, value)` pairs, and the runtime asks for a decision at each
/// point without otherwise stating what kind it expects, so replay needs
/// the kind to check the program is retracing the same points it recorded.
pub trait ExplorationStrategy: Send {
    /// Short name matching `weave_common::StrategyKind::name()`.
    fn name(&self) -> &'static str;

    /// Choose the next operation to run from the enabled set (§3.5).
    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind>;

    /// Resolve a `Random-Bool` schedule point.
    fn choose_bool(&mut self, kind: ScheduleKind) -> Result<bool, FailureKind>;

    /// Resolve a `Random-Int` schedule point; result is in `0..=upper`.
    fn choose_int(&mut self, upper: u64, kind: ScheduleKind) -> Result<u64, FailureKind>;

    /// Reset internal state for the next iteration. Returns `false` once the
    /// strategy has nothing further to explore (only meaningful for
    /// exhaustive strategies like DFS/DPOR; others always return `true`).
    fn prepare_next_iteration(&mut self) -> bool;

    /// Optional signal hook for strategies that need more than the three
    /// decision calls (probabilistic race's recency bias, DPOR's
    /// independence tracking). No-op by default.
    fn observe(&mut self, _point: &SchedulePoint) {}

    /// Optional dependency signal for DPOR: the runtime calls this when it
    /// determines, from information only it has (actor ownership, resource
    /// identity), that two already-made choices raced on the same resource.
    /// No-op for every strategy except [`DporStrategy`].
    fn note_dependency(&mut self, _a: OperationId, _b: OperationId) {}
}

/// Build the configured strategy (§6 `strategy` option).
///
/// `Replay` is constructed separately via [`ReplayStrategy::new`] because it
/// needs a loaded trace, not just a seed; this factory is for the other six.
pub fn from_kind(kind: weave_common::StrategyKind, seed: u64) -> Box<dyn ExplorationStrategy> {
    use weave_common::StrategyKind::*;
    match kind {
        Random => Box::new(RandomStrategy::new(seed)),
        Pct => Box::new(PriorityStrategy::new(seed, 3)),
        Dfs => Box::new(DfsStrategy::new()),
        Dpor => Box::new(DporStrategy::new()),
        Fair => Box::new(FairStrategy::new(seed)),
        Replay => panic!("ReplayStrategy must be constructed with a loaded trace"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_rejects_replay() {
        let result = std::panic::catch_unwind(|| from_kind(weave_common::StrategyKind::Replay, 0));
        assert!(result.is_err());
    }

    #[test]
    fn factory_builds_each_non_replay_kind() {
        for kind in [
            weave_common::StrategyKind::Random,
            weave_common::StrategyKind::Pct,
            weave_common::StrategyKind::Dfs,
            weave_common::StrategyKind::Dpor,
            weave_common::StrategyKind::Fair,
        ] {
            let strategy = from_kind(kind, 1);
            assert_eq!(strategy.name(), kind.name());
        }
    }

    #[test]
    fn observe_and_note_dependency_default_to_no_ops() {
        let mut s = RandomStrategy::new(0);
        s.observe(&SchedulePoint {
            kind: ScheduleKind::Send,
            operation: OperationId::from_raw(0),
            value: weave_core::PointValue::None,
            wall_index: 0,
        });
        s.note_dependency(OperationId::from_raw(0), OperationId::from_raw(1));
    }
}
