//! Schedule Point (§3.2): a tagged record captured at every scheduling
//! decision, and the value a strategy chose for it.

use std::fmt;

use weave_common::OperationId;

/// The kind of scheduling point (§3.2), verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    TaskCreate,
    TaskYield,
    ContinueAwait,
    Send,
    Dequeue,
    Receive,
    Lock,
    Unlock,
    Wait,
    Pulse,
    RandomBool,
    RandomInt,
    Delay,
    Interlocked,
    Halt,
}

impl ScheduleKind {
    /// Whether this point asks the strategy for an operation choice (as
    /// opposed to a boolean or integer nondeterministic choice).
    pub fn is_operation_choice(self) -> bool {
        !matches!(self, ScheduleKind::RandomBool | ScheduleKind::RandomInt)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleKind::TaskCreate => "TaskCreate",
            ScheduleKind::TaskYield => "TaskYield",
            ScheduleKind::ContinueAwait => "ContinueAwait",
            ScheduleKind::Send => "Send",
            ScheduleKind::Dequeue => "Dequeue",
            ScheduleKind::Receive => "Receive",
            ScheduleKind::Lock => "Lock",
            ScheduleKind::Unlock => "Unlock",
            ScheduleKind::Wait => "Wait",
            ScheduleKind::Pulse => "Pulse",
            ScheduleKind::RandomBool => "Random-Bool",
            ScheduleKind::RandomInt => "Random-Int",
            ScheduleKind::Delay => "Delay",
            ScheduleKind::Interlocked => "Interlocked",
            ScheduleKind::Halt => "Halt",
        };
        f.write_str(s)
    }
}

/// The value a strategy chose at a schedule point (§3.2 "value chosen").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointValue {
    Operation(OperationId),
    Bool(bool),
    Int(u64),
    /// Points that don't carry a chosen value of their own (e.g. `Unlock`,
    /// which is just a marker that the scheduler observed the unlock).
    None,
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Operation(id) => write!(f, "{id}"),
            PointValue::Bool(b) => write!(f, "{b}"),
            PointValue::Int(i) => write!(f, "{i}"),
            PointValue::None => write!(f, "-"),
        }
    }
}

/// A fully captured schedule point: what kind of decision, which operation
/// made it, what value was chosen, and its position in the overall
/// schedule (§3.2 "wall index").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePoint {
    pub kind: ScheduleKind,
    pub operation: OperationId,
    pub value: PointValue,
    pub wall_index: u64,
}

impl fmt::Display for SchedulePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} -> {}",
            self.wall_index, self.kind, self.operation, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_points_are_not_operation_choices() {
        assert!(!ScheduleKind::RandomBool.is_operation_choice());
        assert!(!ScheduleKind::RandomInt.is_operation_choice());
        assert!(ScheduleKind::Send.is_operation_choice());
    }

    #[test]
    fn display_is_human_readable() {
        let p = SchedulePoint {
            kind: ScheduleKind::Send,
            operation: OperationId::from_raw(3),
            value: PointValue::Operation(OperationId::from_raw(5)),
            wall_index: 10,
        };
        assert_eq!(p.to_string(), "[10] Send by op(3) -> op(5)");
    }
}
