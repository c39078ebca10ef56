//! Trace & Replay (C6, §4.5/§6).
//!
//! A `Trace` is the ordered sequence of decisions a strategy made in one
//! iteration — "self-describing, stable under reformatting" (§4.5) — plus
//! the header metadata (seed, strategy name) a driver needs to label a
//! reproduction file. `Trace::render`/`Trace::parse` implement the exact
//! text format from §6:
//!
//! ```text
//! # trace v1 seed=<n> strategy=<name>
//! <kind>:<value>
//! <kind>:<value>
//! # end
//! ```

pub mod entry;
pub mod error;
pub mod recorder;

pub use entry::{TraceEntry, TraceValue};
pub use error::TraceError;
pub use recorder::TraceRecorder;

/// A recorded or loaded trace (§3.6, §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub seed: u64,
    pub strategy: String,
    pub entries: Vec<TraceEntry>,
}

const HEADER_PREFIX: &str = "# trace v1 seed=";
const TRAILER: &str = "# end";

impl Trace {
    pub fn new(seed: u64, strategy: impl Into<String>) -> Self {
        Trace {
            seed,
            strategy: strategy.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Render the exact text format from §6.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER_PREFIX);
        out.push_str(&self.seed.to_string());
        out.push_str(" strategy=");
        out.push_str(&self.strategy);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out.push_str(TRAILER);
        out.push('\n');
        out
    }

    /// Parse the exact text format from §6, rejecting anything that
    /// doesn't round-trip (missing header, missing trailer, malformed
    /// line).
    pub fn parse(text: &str) -> Result<Self, TraceError> {
        let mut lines = text.lines();

        let header = lines.next().ok_or(TraceError::MissingHeader)?;
        let (seed, strategy) = parse_header(header)?;

        let mut entries = Vec::new();
        let mut saw_trailer = false;
        for (idx, line) in lines.enumerate() {
            let line_no = idx + 2; // header was line 1
            if line.trim().is_empty() {
                continue;
            }
            if line.trim() == TRAILER {
                saw_trailer = true;
                break;
            }
            let entry = line
                .parse::<TraceEntry>()
                .map_err(|detail| TraceError::MalformedLine { line_no, detail })?;
            entries.push(entry);
        }

        if !saw_trailer {
            return Err(TraceError::MissingTrailer);
        }

        Ok(Trace {
            seed,
            strategy,
            entries,
        })
    }
}

fn parse_header(header: &str) -> Result<(u64, String), TraceError> {
    let rest = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or_else(|| TraceError::MalformedHeader(header.to_string()))?;
    let (seed_str, strategy_part) = rest
        .split_once(' ')
        .ok_or_else(|| TraceError::MalformedHeader(header.to_string()))?;
    let seed: u64 = seed_str
        .parse()
        .map_err(|_| TraceError::MalformedHeader(header.to_string()))?;
    let strategy = strategy_part
        .strip_prefix("strategy=")
        .ok_or_else(|| TraceError::MalformedHeader(header.to_string()))?
        .to_string();
    Ok((seed, strategy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::ScheduleKind;

    fn sample_trace() -> Trace {
        let mut t = Trace::new(42, "pct");
        t.push(TraceEntry {
            kind: ScheduleKind::TaskCreate,
            value: TraceValue::Operation(0),
        });
        t.push(TraceEntry {
            kind: ScheduleKind::Send,
            value: TraceValue::Operation(1),
        });
        t.push(TraceEntry {
            kind: ScheduleKind::RandomBool,
            value: TraceValue::Bool(true),
        });
        t
    }

    #[test]
    fn render_matches_documented_format() {
        let rendered = sample_trace().render();
        let expected = "# trace v1 seed=42 strategy=pct\n\
                         TaskCreate:op0\n\
                         Send:op1\n\
                         RandomBool:true\n\
                         # end\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn render_then_parse_round_trips() {
        let original = sample_trace();
        let rendered = original.render();
        let parsed = Trace::parse(&rendered).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn parse_rejects_missing_header() {
        assert_eq!(Trace::parse("").unwrap_err(), TraceError::MissingHeader);
    }

    #[test]
    fn parse_rejects_missing_trailer() {
        let text = "# trace v1 seed=1 strategy=random\nSend:op0\n";
        assert_eq!(Trace::parse(text).unwrap_err(), TraceError::MissingTrailer);
    }

    #[test]
    fn parse_reports_malformed_line_with_line_number() {
        let text = "# trace v1 seed=1 strategy=random\nSend:op0\nnotvalid\n# end\n";
        match Trace::parse(text) {
            Err(TraceError::MalformedLine { line_no, .. }) => assert_eq!(line_no, 3),
            other => panic!("expected MalformedLine, got {other:?}"),
        }
    }
}
