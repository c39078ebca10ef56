//! Liveness-fair strategy (§4.4 "Liveness-fair"): weighted to eventually
//! schedule every enabled operation infinitely often, which is what makes
//! liveness-monitor detection meaningful (§8 I6) — a monitor can only be
//! blamed for staying hot forever if every operation that could have
//! discharged it was actually given a chance to run.
//!
//! Implemented as round-robin by recency: among the enabled set, the
//! operation that has gone the longest without being scheduled always
//! wins. This bounds the number of schedule points between any two
//! consecutive runs of the same perpetually-enabled operation by the size
//! of the enabled set, which is a stronger and simpler fairness guarantee
//! than a probabilistic one.

use rustc_hash::FxHashMap;

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct FairStrategy {
    rng: StdRng,
    last_scheduled: FxHashMap<OperationId, u64>,
    tick: u64,
}

impl FairStrategy {
    pub fn new(seed: u64) -> Self {
        FairStrategy {
            rng: StdRng::seed_from_u64(seed),
            last_scheduled: FxHashMap::default(),
            tick: 0,
        }
    }
}

impl crate::ExplorationStrategy for FairStrategy {
    fn name(&self) -> &'static str {
        "fair"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let chosen = enabled
            .iter()
            .copied()
            .min_by_key(|&op| (*self.last_scheduled.get(&op).unwrap_or(&0), op))
            .expect("enabled set must be non-empty");
        self.tick += 1;
        self.last_scheduled.insert(chosen, self.tick);
        Ok(chosen)
    }

    fn choose_bool(&mut self, _kind: ScheduleKind) -> Result<bool, FailureKind> {
        Ok(self.rng.gen_bool(0.5))
    }

    fn choose_int(&mut self, upper: u64, _kind: ScheduleKind) -> Result<u64, FailureKind> {
        Ok(self.rng.gen_range(0..=upper))
    }

    fn prepare_next_iteration(&mut self) -> bool {
        self.last_scheduled.clear();
        self.tick = 0;
        true
    }
}
