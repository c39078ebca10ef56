//! Actor/state-machine runtime (C5, §3.3/§4.3): the data model and
//! dispatch algorithm for long-lived entities with inboxes, deferred/
//! ignored events, and explicit state hierarchies. Pure and synchronous —
//! threading, schedule points, and cross-actor delivery are
//! `weave-runtime`'s job; this crate only needs to answer "given this
//! inbox and this state, what happens next".

pub mod behavior;
pub mod event;
pub mod executor;
pub mod inbox;
pub mod transition;

pub use behavior::{ActorBehavior, FailurePolicy};
pub use event::{Event, Outbox};
pub use executor::{ActorExecutor, DispatchOutcome, Phase};
pub use inbox::Inbox;
pub use transition::Transition;

#[cfg(test)]
mod cache_coherence_tests {
    //! Exercises the dispatch algorithm with a small cache-coherence host
    //! (three clients requesting shared/exclusive access through one host
    //! actor): never two clients granted `Exclusive` at once, and never one
    //! client `Exclusive` while another holds `Sharing`.

    use weave_common::ActorId;

    use crate::{ActorBehavior, ActorExecutor, Event, Outbox, Transition};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum HostState {
        Idle,
    }

    struct CacheHost {
        exclusive: Option<ActorId>,
        sharers: Vec<ActorId>,
    }

    impl CacheHost {
        fn new() -> Self {
            CacheHost {
                exclusive: None,
                sharers: Vec::new(),
            }
        }

        fn assert_mutual_exclusion(&self) {
            assert!(
                !(self.exclusive.is_some() && !self.sharers.is_empty()),
                "exclusive owner coexists with sharers: {:?} / {:?}",
                self.exclusive,
                self.sharers
            );
        }
    }

    impl ActorBehavior for CacheHost {
        type State = HostState;

        fn initial_state(&self) -> HostState {
            HostState::Idle
        }

        fn handle(
            &mut self,
            _state: HostState,
            event: &Event,
            _outbox: &mut Outbox,
        ) -> Result<Transition<HostState>, String> {
            let client = *event
                .payload_as::<ActorId>()
                .expect("cache protocol events always carry the requesting client's id");
            match event.kind.as_str() {
                "ReqShared" => {
                    if self.exclusive.is_none() {
                        self.sharers.push(client);
                    }
                }
                "ReqExclusive" => {
                    if self.exclusive.is_none() && self.sharers.is_empty() {
                        self.exclusive = Some(client);
                    }
                }
                "Release" => {
                    if self.exclusive == Some(client) {
                        self.exclusive = None;
                    }
                    self.sharers.retain(|&c| c != client);
                }
                other => return Err(format!("unexpected event kind: {other}")),
            }
            self.assert_mutual_exclusion();
            Ok(Transition::Continue)
        }
    }

    fn run(events: Vec<(&str, ActorId)>) -> ActorExecutor<CacheHost> {
        let mut host = ActorExecutor::new(ActorId::next(), Some("host".into()), CacheHost::new());
        for (kind, client) in events {
            host.enqueue(Event::new(kind, client));
            host.dispatch_next();
        }
        host
    }

    #[test]
    fn exclusive_request_is_denied_while_sharers_hold_the_line() {
        let a = ActorId::next();
        let b = ActorId::next();
        let host = run(vec![("ReqShared", a), ("ReqExclusive", b)]);
        host.behavior().assert_mutual_exclusion();
        // b's exclusive request must have been denied: a is still sharing.
        assert!(host.behavior().sharers.contains(&a));
        assert_ne!(host.behavior().exclusive, Some(b));
    }

    #[test]
    fn exclusive_grant_is_exclusive_until_released() {
        let a = ActorId::next();
        let b = ActorId::next();
        let host = run(vec![
            ("ReqExclusive", a),
            ("ReqShared", b),
            ("Release", a),
            ("ReqShared", b),
        ]);
        host.behavior().assert_mutual_exclusion();
        assert_eq!(host.behavior().exclusive, None);
        assert!(host.behavior().sharers.contains(&b));
    }

    #[test]
    fn every_interleaving_of_three_clients_preserves_mutual_exclusion() {
        let clients: Vec<ActorId> = (0..3).map(|_| ActorId::next()).collect();
        // A handful of representative interleavings; the invariant itself
        // is checked on every single dispatch inside `handle`, so any
        // violation panics immediately rather than needing a final assert.
        let orders = [
            vec![0, 1, 2],
            vec![2, 1, 0],
            vec![1, 0, 2],
        ];
        for order in orders {
            let mut events = Vec::new();
            for &i in &order {
                events.push(("ReqExclusive", clients[i]));
                events.push(("Release", clients[i]));
                events.push(("ReqShared", clients[i]));
                events.push(("Release", clients[i]));
            }
            run(events);
        }
    }
}
