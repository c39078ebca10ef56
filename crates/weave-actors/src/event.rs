//! The event payload travelling through an actor's inbox (§3.3, §3.1 "Event
//! payload" concretization, §3).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use weave_common::{ActorId, GroupId};
use weave_core::EventKind;

/// A message sent to an actor. The payload is type-erased so handler
/// tables can match on `EventKind` alone without downcasting; the handler
/// body downcasts the payload only when it actually needs the contents.
#[derive(Clone)]
pub struct Event {
    pub kind: EventKind,
    pub payload: Arc<dyn Any + Send + Sync>,
    /// Causal group id propagated from sender to receiver (§3.1 "Group").
    pub group: Option<GroupId>,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>, payload: impl Any + Send + Sync) -> Self {
        Event {
            kind: kind.into(),
            payload: Arc::new(payload),
            group: None,
        }
    }

    /// A payload-less event, e.g. a pure signal like `Halt`.
    pub fn signal(kind: impl Into<EventKind>) -> Self {
        Event::new(kind, ())
    }

    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("group", &self.group)
            .finish()
    }
}

/// Messages a handler wants delivered to other actors while it processes
/// one event. Handlers stay pure step functions — they describe intent
/// here rather than touching any runtime channel directly; `weave-runtime`
/// drains this after the handler returns and performs the actual delivery
/// (with whatever schedule point that requires).
#[derive(Default)]
pub struct Outbox {
    sends: Vec<(ActorId, Event)>,
}

impl Outbox {
    pub fn send(&mut self, target: ActorId, event: Event) {
        self.sends.push((target, event));
    }

    pub(crate) fn take(&mut self) -> Vec<(ActorId, Event)> {
        std::mem::take(&mut self.sends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_downcasts_to_the_original_type() {
        let event = Event::new("Deposit", 42i64);
        assert_eq!(event.payload_as::<i64>(), Some(&42));
        assert_eq!(event.payload_as::<String>(), None);
    }

    #[test]
    fn group_defaults_to_none_and_can_be_set() {
        let group = GroupId::next();
        let event = Event::signal("Ping").with_group(group);
        assert_eq!(event.group, Some(group));
    }

    #[test]
    fn outbox_accumulates_sends_in_order_and_drains_on_take() {
        let mut outbox = Outbox::default();
        let a = ActorId::next();
        let b = ActorId::next();
        outbox.send(a, Event::signal("First"));
        outbox.send(b, Event::signal("Second"));
        let sends = outbox.take();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0].0, a);
        assert_eq!(sends[1].0, b);
        assert!(outbox.take().is_empty());
    }
}
