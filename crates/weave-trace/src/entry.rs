//! A single recorded decision (§4.5: "Ordered sequence of tuples
//! `(point-kind, chosen-value)`").

use std::fmt;
use std::str::FromStr;

use weave_core::ScheduleKind;

/// The chosen value for one trace entry, in the plain parseable encoding
/// used by the trace *file* (distinct from `weave_core::PointValue`'s
/// human-readable `Display`, which is used only for the verbose log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceValue {
    Operation(u64),
    Bool(bool),
    Int(u64),
    None,
}

impl fmt::Display for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceValue::Operation(id) => write!(f, "op{id}"),
            TraceValue::Bool(b) => write!(f, "{b}"),
            TraceValue::Int(i) => write!(f, "{i}"),
            TraceValue::None => write!(f, "_"),
        }
    }
}

impl FromStr for TraceValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "_" {
            return Ok(TraceValue::None);
        }
        if s == "true" {
            return Ok(TraceValue::Bool(true));
        }
        if s == "false" {
            return Ok(TraceValue::Bool(false));
        }
        if let Some(rest) = s.strip_prefix("op") {
            return rest
                .parse::<u64>()
                .map(TraceValue::Operation)
                .map_err(|_| format!("malformed operation value: {s}"));
        }
        s.parse::<u64>()
            .map(TraceValue::Int)
            .map_err(|_| format!("malformed trace value: {s}"))
    }
}

/// One `<kind>:<value>` line in the trace body (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub kind: ScheduleKind,
    pub value: TraceValue,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", kind_tag(self.kind), self.value)
    }
}

/// Stable, parseable tags for each `ScheduleKind`. Kept distinct from
/// `ScheduleKind`'s `Display` (which uses human-punctuated names like
/// `Random-Bool`) so the trace format has no hyphens to split on.
fn kind_tag(kind: ScheduleKind) -> &'static str {
    match kind {
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
        ScheduleKind::RandomBool => "RandomBool",
        ScheduleKind::RandomInt => "RandomInt",
        ScheduleKind::Delay => "Delay",
        ScheduleKind::Interlocked => "Interlocked",
        ScheduleKind::Halt => "Halt",
    }
}

pub(crate) fn kind_from_tag(tag: &str) -> Option<ScheduleKind> {
    Some(match tag {
        "TaskCreate" => ScheduleKind::TaskCreate,
        "TaskYield" => ScheduleKind::TaskYield,
        "ContinueAwait" => ScheduleKind::ContinueAwait,
        "Send" => ScheduleKind::Send,
        "Dequeue" => ScheduleKind::Dequeue,
        "Receive" => ScheduleKind::Receive,
        "Lock" => ScheduleKind::Lock,
        "Unlock" => ScheduleKind::Unlock,
        "Wait" => ScheduleKind::Wait,
        "Pulse" => ScheduleKind::Pulse,
        "RandomBool" => ScheduleKind::RandomBool,
        "RandomInt" => ScheduleKind::RandomInt,
        "Delay" => ScheduleKind::Delay,
        "Interlocked" => ScheduleKind::Interlocked,
        "Halt" => ScheduleKind::Halt,
        _ => return None,
    })
}

impl FromStr for TraceEntry {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (tag, value) = line
            .split_once(':')
            .ok_or_else(|| format!("malformed trace line (missing ':'): {line}"))?;
        let kind = kind_from_tag(tag).ok_or_else(|| format!("unknown schedule kind: {tag}"))?;
        let value = value.parse()?;
        Ok(TraceEntry { kind, value })
    }
}
