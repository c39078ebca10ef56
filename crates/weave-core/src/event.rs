//! Event kinds and resource handles used by the operation status model.

use std::fmt;
use std::sync::Arc;

/// The kind of an event sent to an actor's inbox (§3.3). User code names its
/// own event kinds; this is an interned string rather than a closed enum so
/// actor types defined across crates can each mint their own vocabulary.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EventKind(Arc<str>);

impl EventKind {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        EventKind(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKind({})", self.0)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        EventKind(Arc::from(s))
    }
}

/// An opaque handle to a shared resource (mutex, semaphore, completion
/// source) that an operation can block on (§3.1 `Blocked-on-Resource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        ResourceHandle(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_equality_is_by_value() {
        assert_eq!(EventKind::new("Ping"), EventKind::new("Ping"));
        assert_ne!(EventKind::new("Ping"), EventKind::new("Pong"));
    }

    #[test]
    fn resource_handles_are_unique() {
        assert_ne!(ResourceHandle::next(), ResourceHandle::next());
    }
}
