//! Partial-order reduction (§4.4 "Partial-order (DPOR)").
//!
//! Built on the same backtracking decision tree as [`DfsStrategy`], but
//! operation-choice frames are pruned before exploration using an
//! independence relation: two operations are *dependent* only once the
//! runtime tells us so via [`ExplorationStrategy::note_dependency`] (the
//! strategy has no visibility into actor/resource identity on its own —
//! only the runtime knows which operations touched the same actor or
//! resource at their most recent schedule point). Enabled operations with
//! no recorded dependency on any other currently-enabled operation are
//! collapsed to a single representative, since exploring more than one
//! ordering of truly independent transitions cannot reach a new program
//! state; operations that *are* dependent with something else in the
//! enabled set are each kept as their own alternative, which is sound but,
//! per the chosen resolution of DPOR's open independence question for
//! same-target sends (they are treated as dependent), can explore some redundant
//! interleavings rather than the single minimal representative.
//!
//! [`DfsStrategy`]: crate::DfsStrategy

use rustc_hash::FxHashSet;

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};

use crate::ExplorationStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alt {
    Operation(OperationId),
    Bool(bool),
    Int(u64),
}

struct Frame {
    current: Alt,
    remaining: Vec<Alt>,
}

pub struct DporStrategy {
    stack: Vec<Frame>,
    position: usize,
    exhausted: bool,
    /// Normalized (lower, higher) pairs of operations known to race,
    /// accumulated across the whole exploration (a dependency discovered
    /// in one iteration still applies to future ones).
    dependent: FxHashSet<(u64, u64)>,
}

impl DporStrategy {
    pub fn new() -> Self {
        DporStrategy {
            stack: Vec::new(),
            position: 0,
            exhausted: false,
            dependent: FxHashSet::default(),
        }
    }

    fn is_dependent(&self, a: OperationId, b: OperationId) -> bool {
        let (a, b) = (a.as_u64(), b.as_u64());
        let key = if a < b { (a, b) } else { (b, a) };
        self.dependent.contains(&key)
    }

    /// Collapse enabled operations with no recorded race against any other
    /// enabled operation to a single representative.
    fn reduce(&self, enabled: &[OperationId]) -> Vec<OperationId> {
        let mut kept = Vec::new();
        let mut collapsed_independent = false;
        for &op in enabled {
            let races_someone = enabled
                .iter()
                .any(|&other| other != op && self.is_dependent(op, other));
            if races_someone {
                kept.push(op);
            } else if !collapsed_independent {
                kept.push(op);
                collapsed_independent = true;
            }
        }
        kept
    }

    fn step<T>(
        &mut self,
        build: impl FnOnce() -> Vec<Alt>,
        unwrap: impl Fn(Alt) -> Option<T>,
    ) -> T {
        let alt = if self.position < self.stack.len() {
            self.stack[self.position].current
        } else {
            let mut alternatives = build();
            assert!(
                !alternatives.is_empty(),
                "DPOR reached a schedule point with no alternatives to choose from"
            );
            let current = alternatives.remove(0);
            self.stack.push(Frame {
                current,
                remaining: alternatives,
            });
            current
        };
        self.position += 1;
        unwrap(alt).expect(
            "DPOR replayed a different kind of decision at this depth; the program's control \
             flow must be deterministic given the same prefix of choices",
        )
    }
}

impl Default for DporStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationStrategy for DporStrategy {
    fn name(&self) -> &'static str {
        "dpor"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let options: Vec<OperationId> = enabled.iter().copied().collect();
        let reduced = self.reduce(&options);
        Ok(self.step(
            || reduced.into_iter().map(Alt::Operation).collect(),
            |a| match a {
                Alt::Operation(id) => Some(id),
                _ => None,
            },
        ))
    }

    fn choose_bool(&mut self, _kind: ScheduleKind) -> Result<bool, FailureKind> {
        Ok(self.step(
            || vec![Alt::Bool(false), Alt::Bool(true)],
            |a| match a {
                Alt::Bool(b) => Some(b),
                _ => None,
            },
        ))
    }

    fn choose_int(&mut self, upper: u64, _kind: ScheduleKind) -> Result<u64, FailureKind> {
        Ok(self.step(
            || (0..=upper).map(Alt::Int).collect(),
            |a| match a {
                Alt::Int(i) => Some(i),
                _ => None,
            },
        ))
    }

    fn prepare_next_iteration(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        loop {
            match self.stack.last_mut() {
                None => {
                    self.exhausted = true;
                    return false;
                }
                Some(frame) if frame.remaining.is_empty() => {
                    self.stack.pop();
                }
                Some(frame) => {
                    frame.current = frame.remaining.remove(0);
                    self.position = 0;
                    return true;
                }
            }
        }
    }

    fn note_dependency(&mut self, a: OperationId, b: OperationId) {
        let (a, b) = (a.as_u64(), b.as_u64());
        let key = if a < b { (a, b) } else { (b, a) };
        self.dependent.insert(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u64]) -> EnabledSet {
        ids.iter().map(|&n| OperationId::from_raw(n)).collect()
    }

    /// With no recorded dependency, two enabled operations are fully
    /// independent, so DPOR must collapse them to a single representative
    /// and report exhaustion after exactly one iteration.
    #[test]
    fn independent_operations_collapse_to_one_representative() {
        let mut s = DporStrategy::new();
        let enabled = set(&[1, 2]);
        s.choose_next(&enabled, ScheduleKind::Send).unwrap();
        assert!(!s.prepare_next_iteration());
    }

    /// Once the runtime reports a race between two operations, DPOR must
    /// explore both orderings, same as plain DFS would.
    #[test]
    fn dependent_operations_are_each_explored() {
        let mut s = DporStrategy::new();
        s.note_dependency(OperationId::from_raw(1), OperationId::from_raw(2));
        let enabled = set(&[1, 2]);
        let mut seen = Vec::new();
        loop {
            seen.push(s.choose_next(&enabled, ScheduleKind::Send).unwrap());
            if !s.prepare_next_iteration() {
                break;
            }
        }
        seen.sort();
        assert_eq!(seen, vec![OperationId::from_raw(1), OperationId::from_raw(2)]);
    }

    #[test]
    fn dependency_is_order_independent() {
        let mut s = DporStrategy::new();
        s.note_dependency(OperationId::from_raw(5), OperationId::from_raw(2));
        assert!(s.is_dependent(OperationId::from_raw(2), OperationId::from_raw(5)));
    }
}
