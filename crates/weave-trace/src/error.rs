use std::fmt;

/// Errors parsing or replaying a trace file (§4.5, §7 `TraceMismatch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    MissingHeader,
    MalformedHeader(String),
    MissingTrailer,
    MalformedLine { line_no: usize, detail: String },
    /// Replay demanded a decision of a different kind than the one recorded
    /// at this position (§7 `TraceMismatch`).
    Mismatch {
        position: usize,
        expected: String,
        found: String,
    },
    /// Replay ran out of recorded decisions before the program finished.
    Exhausted { position: usize },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::MissingHeader => write!(f, "trace file is missing its header line"),
            TraceError::MalformedHeader(h) => write!(f, "malformed trace header: {h}"),
            TraceError::MissingTrailer => write!(f, "trace file is missing its '# end' trailer"),
            TraceError::MalformedLine { line_no, detail } => {
                write!(f, "malformed trace line {line_no}: {detail}")
            }
            TraceError::Mismatch {
                position,
                expected,
                found,
            } => write!(
                f,
                "TraceMismatch at decision {position}: replay expected {expected}, found {found}"
            ),
            TraceError::Exhausted { position } => write!(
                f,
                "TraceMismatch: replay trace exhausted at decision {position} but the program kept running"
            ),
        }
    }
}

impl std::error::Error for TraceError {}
