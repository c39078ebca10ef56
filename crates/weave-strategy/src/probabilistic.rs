//! Probabilistic race strategy (§4.4 "Probabilistic race"): random choice
//! with a tunable bias toward operations that recently touched shared
//! state, increasing the odds of hitting an actual race window compared to
//! plain uniform random.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind, SchedulePoint};

use crate::ExplorationStrategy;

/// How many of the most recent schedule points are considered "recent" for
/// the recency bonus.
const RECENCY_WINDOW: usize = 8;

/// Schedule-point kinds that count as touching shared state for recency
/// purposes — the synchronization and shared-memory primitives from §4.2,
/// as opposed to pure control-flow points like `TaskCreate`/`TaskYield`.
fn touches_shared_state(kind: ScheduleKind) -> bool {
    matches!(
        kind,
        ScheduleKind::Lock
            | ScheduleKind::Unlock
            | ScheduleKind::Wait
            | ScheduleKind::Pulse
            | ScheduleKind::Interlocked
            | ScheduleKind::Send
    )
}

pub struct ProbabilisticStrategy {
    rng: StdRng,
    /// Multiplier applied to an operation's weight if it appears in the
    /// recency window.
    bias: u32,
    recent: VecDeque<OperationId>,
}

impl ProbabilisticStrategy {
    pub fn new(seed: u64, bias: u32) -> Self {
        ProbabilisticStrategy {
            rng: StdRng::seed_from_u64(seed),
            bias: bias.max(1),
            recent: VecDeque::with_capacity(RECENCY_WINDOW),
        }
    }

    fn weight(&self, op: OperationId) -> u32 {
        if self.recent.contains(&op) {
            self.bias
        } else {
            1
        }
    }
}

impl ExplorationStrategy for ProbabilisticStrategy {
    fn name(&self) -> &'static str {
        "probabilistic"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let options: Vec<OperationId> = enabled.iter().copied().collect();
        let weights: Vec<u32> = options.iter().map(|&op| self.weight(op)).collect();
        let total: u32 = weights.iter().sum();
        let mut pick = self.rng.gen_range(0..total);
        for (idx, w) in weights.iter().enumerate() {
            if pick < *w {
                return Ok(options[idx]);
            }
            pick -= w;
        }
        unreachable!("weighted pick must land within the cumulative weight total")
    }

    fn choose_bool(&mut self, _kind: ScheduleKind) -> Result<bool, FailureKind> {
        Ok(self.rng.gen_bool(0.5))
    }

    fn choose_int(&mut self, upper: u64, _kind: ScheduleKind) -> Result<u64, FailureKind> {
        Ok(self.rng.gen_range(0..=upper))
    }

    fn prepare_next_iteration(&mut self) -> bool {
        self.recent.clear();
        true
    }

    fn observe(&mut self, point: &SchedulePoint) {
        if !touches_shared_state(point.kind) {
            return;
        }
        if self.recent.len() == RECENCY_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(point.operation);
    }
}
