//! End-to-end scenario 5 (§8): N>=3 actors arranged in a ring, each syncing
//! a counter with its left and right neighbor. Property (I-sync): a
//! received count never differs from the receiver's own count by more than
//! one; each actor halts once its own count reaches 10.
//!
//! Every actor only advances its own round after hearing from *both*
//! neighbors for the current round, so the whole ring advances in lockstep
//! — the same bounded round-synchronization discipline that keeps the
//! skew on any one edge at most one.

use weave::{ActorBehavior, ActorHandle, ActorId, Config, Engine, Event, Mailbox, Outbox, StrategyKind, TaskCtx, Transition};

const RING_SIZE: usize = 4;
const TARGET: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Idle {
    Only,
}

struct NeighborCounter {
    left: Option<Mailbox>,
    right: Option<Mailbox>,
    self_id: Option<ActorId>,
    own_count: u32,
    from_left: Option<u32>,
    from_right: Option<u32>,
}

impl NeighborCounter {
    fn new() -> Self {
        NeighborCounter {
            left: None,
            right: None,
            self_id: None,
            own_count: 0,
            from_left: None,
            from_right: None,
        }
    }

    fn broadcast(&self, outbox: &mut Outbox) {
        let left = self.left.as_ref().expect("wired before Start");
        let right = self.right.as_ref().expect("wired before Start");
        let self_id = self.self_id.expect("self id set by Start before any broadcast");
        outbox.send(left.id(), Event::new("Count", (self_id, self.own_count)));
        outbox.send(right.id(), Event::new("Count", (self_id, self.own_count)));
    }
}

impl ActorBehavior for NeighborCounter {
    type State = Idle;

    fn initial_state(&self) -> Idle {
        Idle::Only
    }

    fn handle(&mut self, _state: Idle, event: &Event, outbox: &mut Outbox) -> Result<Transition<Idle>, String> {
        match event.kind.as_str() {
            "Wire" => {
                let (left, right) = event
                    .payload_as::<(Mailbox, Mailbox)>()
                    .expect("Wire carries this node's left and right neighbor mailboxes");
                self.left = Some(left.clone());
                self.right = Some(right.clone());
                Ok(Transition::Continue)
            }
            "Start" => {
                let self_id = *event.payload_as::<ActorId>().expect("Start carries this node's own id");
                self.self_id = Some(self_id);
                self.broadcast(outbox);
                Ok(Transition::Continue)
            }
            "Count" => {
                let (sender, value) = *event
                    .payload_as::<(ActorId, u32)>()
                    .expect("Count carries the sender's id and its round count");
                if (value as i64 - self.own_count as i64).abs() > 1 {
                    return Err(format!(
                        "neighbor skew: received {value} but own count is {}",
                        self.own_count
                    ));
                }
                let left_id = self.left.as_ref().expect("wired before any Count arrives").id();
                if sender == left_id {
                    self.from_left = Some(value);
                } else {
                    self.from_right = Some(value);
                }
                if self.from_left.is_some() && self.from_right.is_some() {
                    self.from_left = None;
                    self.from_right = None;
                    self.own_count += 1;
                    if self.own_count >= TARGET {
                        return Ok(Transition::Halt);
                    }
                    self.broadcast(outbox);
                    Ok(Transition::Continue)
                } else {
                    Ok(Transition::Continue)
                }
            }
            other => Err(format!("unexpected: {other}")),
        }
    }
}

#[test]
fn a_ring_of_counters_stays_in_sync_and_halts_at_the_target() {
    let mut cfg = Config::default();
    cfg.strategy = StrategyKind::Random;
    cfg.iterations = 30;
    cfg.max_steps_per_iter = 20_000;
    let engine = Engine::new(cfg).unwrap();

    let outcome = engine
        .run_unmonitored(|| {
            |ctx: TaskCtx| {
                let actors: Vec<_> = (0..RING_SIZE)
                    .map(|i| ActorHandle::spawn(&ctx, format!("node{i}"), NeighborCounter::new()))
                    .collect();

                for i in 0..RING_SIZE {
                    let left = actors[(i + RING_SIZE - 1) % RING_SIZE].mailbox();
                    let right = actors[(i + 1) % RING_SIZE].mailbox();
                    actors[i].send(&ctx, Event::new("Wire", (left, right)))?;
                }
                for actor in &actors {
                    actor.send(&ctx, Event::new("Start", actor.id))?;
                }

                loop {
                    if actors.iter().all(|a| ctx.is_completed(a.operation())) {
                        break;
                    }
                    ctx.yield_now()?;
                }

                for actor in &actors {
                    ctx.assert(actor.inspect(|b| b.own_count) == TARGET, "every node halts exactly at the target count")?;
                }
                Ok(())
            }
        })
        .unwrap();

    assert!(outcome.is_success(), "{:?}", outcome.failing.map(|f| f.result));
}
