//! Ambient stack shared by every `weave-*` crate: stable identifiers, the
//! §7 error taxonomy, the §6 verbose-log tag vocabulary, and `Config`.

pub mod config;
pub mod error;
pub mod ids;
pub mod log;

pub use config::{Config, StrategyKind};
pub use error::{ExitCode, FailureKind};
pub use ids::{ActorId, GroupId, OperationId, TaskId};
pub use log::{LogSink, LogTag, Logger};
