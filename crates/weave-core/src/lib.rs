//! Data model shared by the runtime, actor executor and strategies: the
//! `Operation` (C1, §3.1) and `SchedulePoint` (§3.2).

pub mod event;
pub mod op;
pub mod point;

pub use event::{EventKind, ResourceHandle};
pub use op::{Completion, DebugInfo, Operation, Owner, Status};
pub use point::{PointValue, ScheduleKind, SchedulePoint};
pub use weave_common::OperationId;

/// The set of operations eligible to run at a given scheduling moment
/// (§3.5 "Enabled set"), ordered for the tie-break rule: "order by stable
/// op-id" (§4.4).
pub type EnabledSet = std::collections::BTreeSet<weave_common::OperationId>;
