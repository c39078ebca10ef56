//! Replay strategy (§4.4 "Replay", §4.5, §8 I4): re-executes a program
//! deterministically from a previously recorded [`Trace`], returning the
//! exact values a run recorded instead of making new choices. If the
//! program asks for a decision of a different kind than the one recorded
//! at this position, replay fails with `TraceMismatch` (§7) rather than
//! silently improvising — a mismatch means the program's control flow
//! diverged from the run that produced the trace, so nothing downstream of
//! that point is trustworthy.

use weave_common::FailureKind;
use weave_core::{EnabledSet, OperationId, ScheduleKind};
use weave_trace::{Trace, TraceValue};

use crate::ExplorationStrategy;

pub struct ReplayStrategy {
    trace: Trace,
    position: usize,
}

impl ReplayStrategy {
    pub fn new(trace: Trace) -> Self {
        ReplayStrategy { trace, position: 0 }
    }

    fn next_entry(&mut self, kind: ScheduleKind) -> Result<TraceValue, FailureKind> {
        let entry = self.trace.entries.get(self.position).ok_or_else(|| {
            FailureKind::TraceMismatch {
                expected: "end of trace".to_string(),
                found: format!("program presented another {kind} point"),
            }
        })?;
        if entry.kind != kind {
            return Err(FailureKind::TraceMismatch {
                expected: format!("{}", entry.kind),
                found: format!("{kind}"),
            });
        }
        self.position += 1;
        Ok(entry.value.clone())
    }
}

impl ExplorationStrategy for ReplayStrategy {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn choose_next(
        &mut self,
        enabled: &EnabledSet,
        kind: ScheduleKind,
    ) -> Result<OperationId, FailureKind> {
        let value = self.next_entry(kind)?;
        match value {
            TraceValue::Operation(raw) => {
                let id = OperationId::from_raw(raw);
                if !enabled.contains(&id) {
                    return Err(FailureKind::TraceMismatch {
                        expected: format!("operation {id} enabled"),
                        found: "operation not in the current enabled set".to_string(),
                    });
                }
                Ok(id)
            }
            other => Err(FailureKind::TraceMismatch {
                expected: "an operation value".to_string(),
                found: format!("{other}"),
            }),
        }
    }

    fn choose_bool(&mut self, kind: ScheduleKind) -> Result<bool, FailureKind> {
        match self.next_entry(kind)? {
            TraceValue::Bool(b) => Ok(b),
            other => Err(FailureKind::TraceMismatch {
                expected: "a boolean value".to_string(),
                found: format!("{other}"),
            }),
        }
    }

    fn choose_int(&mut self, _upper: u64, kind: ScheduleKind) -> Result<u64, FailureKind> {
        match self.next_entry(kind)? {
            TraceValue::Int(i) => Ok(i),
            other => Err(FailureKind::TraceMismatch {
                expected: "an integer value".to_string(),
                found: format!("{other}"),
            }),
        }
    }

    fn prepare_next_iteration(&mut self) -> bool {
        // Replay is a one-shot reproduction of a single recorded
        // iteration; there is nothing further to explore.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_trace::TraceEntry;

    fn set(ids: &[u64]) -> EnabledSet {
        ids.iter().map(|&n| OperationId::from_raw(n)).collect()
    }

    fn sample_trace() -> Trace {
        let mut t = Trace::new(7, "replay");
        t.push(TraceEntry {
            kind: ScheduleKind::Send,
            value: TraceValue::Operation(2),
        });
        t.push(TraceEntry {
            kind: ScheduleKind::RandomBool,
            value: TraceValue::Bool(true),
        });
        t
    }

    #[test]
    fn replay_returns_recorded_values_in_order() {
        let mut s = ReplayStrategy::new(sample_trace());
        let enabled = set(&[1, 2, 3]);
        assert_eq!(
            s.choose_next(&enabled, ScheduleKind::Send).unwrap(),
            OperationId::from_raw(2)
        );
        assert!(s.choose_bool(ScheduleKind::RandomBool).unwrap());
    }

    #[test]
    fn kind_mismatch_is_a_trace_mismatch() {
        let mut s = ReplayStrategy::new(sample_trace());
        let err = s.choose_bool(ScheduleKind::RandomBool).unwrap_err();
        assert!(matches!(err, FailureKind::TraceMismatch { .. }));
    }

    #[test]
    fn value_not_in_enabled_set_is_a_trace_mismatch() {
        let mut s = ReplayStrategy::new(sample_trace());
        let enabled = set(&[9]);
        let err = s.choose_next(&enabled, ScheduleKind::Send).unwrap_err();
        assert!(matches!(err, FailureKind::TraceMismatch { .. }));
    }

    #[test]
    fn running_past_the_end_of_the_trace_is_a_trace_mismatch() {
        let mut s = ReplayStrategy::new(sample_trace());
        let enabled = set(&[1, 2, 3]);
        s.choose_next(&enabled, ScheduleKind::Send).unwrap();
        s.choose_bool(ScheduleKind::RandomBool).unwrap();
        let err = s.choose_bool(ScheduleKind::RandomBool).unwrap_err();
        assert!(matches!(err, FailureKind::TraceMismatch { .. }));
    }

    #[test]
    fn prepare_next_iteration_is_always_exhausted() {
        let mut s = ReplayStrategy::new(sample_trace());
        assert!(!s.prepare_next_iteration());
    }
}
