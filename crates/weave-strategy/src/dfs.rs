//! Exhaustive depth-first exploration (§4.4 "Depth-first"; §8 I5).
//!
//! The decision tree is built lazily: the first iteration takes the first
//! alternative at every point it reaches, recording the untried
//! alternatives at each depth. `prepare_next_iteration` backtracks to the
//! deepest frame with an untried alternative left and starts the next run
//! from there, exactly like a textbook DFS over a state space — except the
//! "state space" here is simply the sequence of decisions the program asks
//! for, which is what makes this strategy require the program's control
//! flow to be deterministic given the same prefix of choices.

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};

use crate::ExplorationStrategy;

/// One alternative at a decision point: the three kinds of nondeterministic
/// choice the runtime ever resolves through a strategy (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alt {
    Operation(OperationId),
    Bool(bool),
    Int(u64),
}

/// A single level of the decision tree.
struct Frame {
    current: Alt,
    remaining: Vec<Alt>,
}

pub struct DfsStrategy {
    stack: Vec<Frame>,
    position: usize,
    exhausted: bool,
}

impl DfsStrategy {
    pub fn new() -> Self {
        DfsStrategy {
            stack: Vec::new(),
            position: 0,
            exhausted: false,
        }
    }

    /// Resolve one decision point: reuse the already-chosen alternative if
    /// this depth was visited on an earlier iteration's prefix, otherwise
    /// build the full alternative list and take the first one.
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
                "DFS reached a schedule point with no alternatives to choose from"
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
            "DFS replayed a different kind of decision at this depth; the program's control \
             flow must be deterministic given the same prefix of choices",
        )
    }
}

impl Default for DfsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationStrategy for DfsStrategy {
    fn name(&self) -> &'static str {
        "dfs"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        _kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let options: Vec<OperationId> = enabled.iter().copied().collect();
        Ok(self.step(
            || options.into_iter().map(Alt::Operation).collect(),
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
}
