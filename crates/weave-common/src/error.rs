//! Error taxonomy (§7). Each kind is a plain enum with a hand-written
//! `Display` impl, no `thiserror`, no `anyhow`, just `std::error::Error`
//! implemented directly.

use std::fmt;

/// The category of a fatal failure that ends a test iteration (§7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A handler called the assertion API and it failed.
    Assertion { message: String },
    /// A handler raised an exception that the actor's failure policy did
    /// not swallow.
    UnhandledException { actor: String, message: String },
    /// All operations are `Blocked` and none is `Delayed`.
    Deadlock { waiting: Vec<String> },
    /// A monitor ended the iteration in a hot state, or stayed hot for
    /// `liveness_temperature` consecutive schedule points.
    LivenessViolation { monitor: String, state: String },
    /// Replay demanded a decision kind that did not match what the program
    /// actually presented at that point.
    TraceMismatch { expected: String, found: String },
    /// A non-runtime awaitable or thread was encountered outside fuzzing
    /// fallback mode.
    UncontrolledConcurrency { detail: String },
    /// The supplied [`Config`](crate::config::Config) was rejected before
    /// any iteration ran.
    ConfigurationError { detail: String },
    /// `await` observed that the awaited task had faulted (§4.2 `await`
    /// errors column, `FaultedTask`).
    FaultedTask { message: String },
    /// `await` observed that the awaited task had been cancelled (§4.2
    /// `await` errors column, `Cancelled`).
    TaskCancelled,
    /// A completion source's `set_result` was called on one that was
    /// already completed (§4.2, §8 I3: "further `set_result` calls fail
    /// with `AlreadyCompleted`").
    AlreadyCompleted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Assertion { message } => write!(f, "Assertion failed: {message}"),
            FailureKind::UnhandledException { actor, message } => {
                write!(f, "Unhandled exception in actor '{actor}': {message}")
            }
            FailureKind::Deadlock { waiting } => {
                write!(f, "Deadlock detected. {} are waiting …", waiting.join(", "))
            }
            FailureKind::LivenessViolation { monitor, state } => write!(
                f,
                "Liveness bug: monitor '{monitor}' in hot state '{state}' at end of execution"
            ),
            FailureKind::TraceMismatch { expected, found } => write!(
                f,
                "TraceMismatch: replay expected {expected}, but the program presented {found}"
            ),
            FailureKind::UncontrolledConcurrency { detail } => write!(
                f,
                "Uncontrolled task … is trying to wait for an uncontrolled awaiter ({detail})"
            ),
            FailureKind::ConfigurationError { detail } => {
                write!(f, "Configuration error: {detail}")
            }
            FailureKind::FaultedTask { message } => {
                write!(f, "FaultedTask: awaited task faulted: {message}")
            }
            FailureKind::TaskCancelled => write!(f, "Cancelled: awaited task was cancelled"),
            FailureKind::AlreadyCompleted => {
                write!(f, "AlreadyCompleted: completion source was already completed")
            }
        }
    }
}

impl std::error::Error for FailureKind {}

/// Exit codes for an external CLI driver (§6 "CLI surface"). The core never
/// calls `std::process::exit` itself; a driver maps an iteration outcome
/// onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    BugFound = 1,
    ConfigurationError = 2,
    InternalError = 3,
}

impl FailureKind {
    /// Which exit code an external driver should use for this failure.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::ConfigurationError { .. } => ExitCode::ConfigurationError,
            _ => ExitCode::BugFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_message_matches_spec_wording() {
        let k = FailureKind::Deadlock {
            waiting: vec!["Client".into(), "Server".into()],
        };
        assert_eq!(k.to_string(), "Deadlock detected. Client, Server are waiting …");
    }

    #[test]
    fn liveness_message_matches_spec_wording() {
        let k = FailureKind::LivenessViolation {
            monitor: "PingPong".into(),
            state: "WaitPong".into(),
        };
        assert_eq!(
            k.to_string(),
            "Liveness bug: monitor 'PingPong' in hot state 'WaitPong' at end of execution"
        );
    }

    #[test]
    fn configuration_error_maps_to_exit_code_2() {
        let k = FailureKind::ConfigurationError {
            detail: "iterations must be > 0".into(),
        };
        assert_eq!(k.exit_code(), ExitCode::ConfigurationError);
    }

    #[test]
    fn bug_kinds_map_to_exit_code_1() {
        let k = FailureKind::Assertion {
            message: "x > 0".into(),
        };
        assert_eq!(k.exit_code(), ExitCode::BugFound);
    }
}
