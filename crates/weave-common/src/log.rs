//! Verbose tagged-line logging (§6 "Log format").
//!
//! The existing tag vocabulary (`<CreateLog>`, `<StateLog>`, `<SendLog>`,
//! `<DequeueLog>`, …) is preserved exactly so external tooling can keep
//! parsing it unchanged. This is a fixed text protocol, not general
//! application logging, so it is implemented directly rather than through a
//! structured logging framework.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// One of the fixed set of tags this engine emits. New tags must be added
/// here and nowhere else, so the vocabulary stays centrally documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Create,
    State,
    Send,
    Dequeue,
    Receive,
    Wait,
    Pulse,
    Deadlock,
    Assertion,
    Liveness,
    Halt,
}

impl LogTag {
    fn as_str(self) -> &'static str {
        match self {
            LogTag::Create => "CreateLog",
            LogTag::State => "StateLog",
            LogTag::Send => "SendLog",
            LogTag::Dequeue => "DequeueLog",
            LogTag::Receive => "ReceiveLog",
            LogTag::Wait => "WaitLog",
            LogTag::Pulse => "PulseLog",
            LogTag::Deadlock => "DeadlockLog",
            LogTag::Assertion => "AssertionLog",
            LogTag::Liveness => "LivenessLog",
            LogTag::Halt => "HaltLog",
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

/// Sink for verbose output. Defaults to stderr; tests redirect it to an
/// in-memory buffer so output can be asserted on.
pub trait LogSink: Send {
    fn write_line(&mut self, line: &str);
}

struct StderrSink;

impl LogSink for StderrSink {
    fn write_line(&mut self, line: &str) {
        let _ = writeln!(std::io::stderr(), "{line}");
    }
}

/// Captures lines in memory; used by tests and by drivers that want to
/// inspect the log instead of (or in addition to) printing it.
#[derive(Default)]
pub struct BufferSink {
    pub lines: Vec<String>,
}

impl LogSink for BufferSink {
    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// The verbose logger (§6 `verbose: bool`). When disabled, every call is a
/// no-op check against an `AtomicBool`-backed flag with no formatting cost.
pub struct Logger {
    enabled: bool,
    sink: Mutex<Box<dyn LogSink>>,
}

impl Logger {
    pub fn new(enabled: bool) -> Self {
        Logger {
            enabled,
            sink: Mutex::new(Box::new(StderrSink)),
        }
    }

    pub fn with_sink(enabled: bool, sink: Box<dyn LogSink>) -> Self {
        Logger {
            enabled,
            sink: Mutex::new(sink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit `<tag> detail` if verbose logging is enabled.
    pub fn log(&self, tag: LogTag, detail: impl fmt::Display) {
        if !self.enabled {
            return;
        }
        let line = format!("{tag} {detail}");
        self.sink.lock().unwrap().write_line(&line);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new(false)
    }
}
