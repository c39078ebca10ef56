//! Priority-based scheduling, PCT-style (§4.4 "Priority (PCT-like)").
//!
//! Every operation is assigned a random priority the first time it appears
//! in the enabled set. A bounded number of "priority changes" are inserted
//! per iteration at randomly chosen schedule-point indices; at a change
//! point, a random currently-enabled operation is promoted above every
//! priority assigned so far. Between changes, the highest-priority enabled
//! operation runs. Lower numeric priority means "runs first"; ties resolve
//! to the lowest operation id (§4.4 "Tie-breaks").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};

use crate::ExplorationStrategy;

/// Upper bound on how far into an iteration (counted in schedule points,
/// not wall-clock rounds) a priority-change point may land. Real PCT picks
/// this from the expected depth of the program; this engine has no a priori
/// bound; a generous constant keeps the change points spread across
/// iterations that run anywhere from a handful to a few hundred points.
const CHANGE_POINT_HORIZON: u32 = 200;

pub struct PriorityStrategy {
    rng: StdRng,
    max_changes: u32,
    priorities: FxHashMap<OperationId, i64>,
    next_priority: i64,
    change_points: Vec<u32>,
    step: u32,
}

impl PriorityStrategy {
    pub fn new(seed: u64, max_changes: u32) -> Self {
        let mut strategy = PriorityStrategy {
            rng: StdRng::seed_from_u64(seed),
            max_changes,
            priorities: FxHashMap::default(),
            next_priority: 0,
            change_points: Vec::new(),
            step: 0,
        };
        strategy.roll_change_points();
        strategy
    }

    fn roll_change_points(&mut self) {
        let mut points: Vec<u32> = (0..self.max_changes)
            .map(|_| self.rng.gen_range(0..CHANGE_POINT_HORIZON))
            .collect();
        points.sort_unstable();
        points.dedup();
        self.change_points = points;
    }

    fn priority_of(&mut self, op: OperationId) -> i64 {
        *self.priorities.entry(op).or_insert_with(|| {
            self.next_priority += 1;
            self.next_priority
        })
    }

    /// Apply any change point reached at the current step: promote a
    /// random enabled operation above everything assigned so far.
    fn maybe_change(&mut self, enabled: &[OperationId]) {
        if self.change_points.first() != Some(&self.step) {
            return;
        }
        self.change_points.remove(0);
        if enabled.is_empty() {
            return;
        }
        let idx = self.rng.gen_range(0..enabled.len());
        let promoted = enabled[idx];
        self.next_priority -= 1;
        self.priorities.insert(promoted, self.next_priority);
    }
}

impl ExplorationStrategy for PriorityStrategy {
    fn name(&self) -> &'static str {
        "pct"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let options: Vec<OperationId> = enabled.iter().copied().collect();
        for &op in &options {
            self.priority_of(op);
        }
        self.maybe_change(&options);
        self.step += 1;

        let chosen = options
            .iter()
            .copied()
            .min_by_key(|&op| (self.priorities[&op], op))
            .expect("enabled set must be non-empty");
        Ok(chosen)
    }

    fn choose_bool(&mut self, _kind: ScheduleKind) -> Result<bool, FailureKind> {
        self.step += 1;
        Ok(self.rng.gen_bool(0.5))
    }

    fn choose_int(&mut self, upper: u64, _kind: ScheduleKind) -> Result<u64, FailureKind> {
        self.step += 1;
        Ok(self.rng.gen_range(0..=upper))
    }

    fn prepare_next_iteration(&mut self) -> bool {
        self.priorities.clear();
        self.next_priority = 0;
        self.step = 0;
        self.roll_change_points();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u64]) -> EnabledSet {
        ids.iter().map(|&n| OperationId::from_raw(n)).collect()
    }

    #[test]
    fn choose_next_always_returns_an_enabled_id() {
        let mut s = PriorityStrategy::new(11, 2);
        let enabled = set(&[1, 2, 3]);
        for _ in 0..50 {
            let chosen = s.choose_next(&enabled, ScheduleKind::Send).unwrap();
            assert!(enabled.contains(&chosen));
        }
    }

    #[test]
    fn between_changes_the_highest_priority_op_always_wins() {
        let mut s = PriorityStrategy::new(3, 0);
        let enabled = set(&[1, 2, 3]);
        let first = s.choose_next(&enabled, ScheduleKind::Send).unwrap();
        for _ in 0..20 {
            assert_eq!(s.choose_next(&enabled, ScheduleKind::Send).unwrap(), first);
        }
    }

    #[test]
    fn prepare_next_iteration_resets_priorities() {
        let mut s = PriorityStrategy::new(9, 1);
        let enabled = set(&[1, 2]);
        s.choose_next(&enabled, ScheduleKind::Send).unwrap();
        assert!(s.prepare_next_iteration());
        assert!(s.priorities.is_empty());
    }
}
