//! Uniform random choice over the enabled set, seeded (§4.4 "Random").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};

use crate::ExplorationStrategy;

pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        RandomStrategy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ExplorationStrategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let options: Vec<OperationId> = enabled.iter().copied().collect();
        let idx = self.rng.gen_range(0..options.len());
        Ok(options[idx])
    }

    fn choose_bool(&mut self, _kind: ScheduleKind) -> Result<bool, FailureKind> {
        Ok(self.rng.gen_bool(0.5))
    }

    fn choose_int(&mut self, upper: u64, _kind: ScheduleKind) -> Result<u64, FailureKind> {
        Ok(self.rng.gen_range(0..=upper))
    }

    fn prepare_next_iteration(&mut self) -> bool {
        true
    }
}
