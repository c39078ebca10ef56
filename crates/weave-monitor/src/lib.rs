//! Spec Monitors (C7, §4.6): small state machines observing events raised
//! explicitly via `monitor(event)`. States are labeled Hot (a liveness
//! obligation outstanding) or Cold (satisfied). Monitors never drive
//! scheduling; they only watch (§4.6 "Monitors never drive scheduling;
//! they observe only").

use weave_actors::Event;

/// A user-defined monitor's state machine. `State` is a closed sum type,
/// same convention as `weave_actors::ActorBehavior::State`.
pub trait SpecMonitor: Send {
    type State: Copy + Eq + std::fmt::Debug + Send + 'static;

    fn name(&self) -> &str;
    fn initial_state(&self) -> Self::State;
    fn is_hot(&self, state: Self::State) -> bool;
    fn on_event(&mut self, state: Self::State, event: &Event) -> Self::State;
}

/// Type-erased view of a monitor, so a runtime can hold a heterogeneous
/// collection of monitors with different `State` types behind one trait
/// object (§4.6, §8 I6).
pub trait ObservingMonitor: Send {
    fn name(&self) -> &str;
    fn observe(&mut self, event: &Event);
    fn is_hot(&self) -> bool;
    fn state_name(&self) -> String;
}

/// Adapts a concrete [`SpecMonitor`] to the type-erased [`ObservingMonitor`]
/// interface by keeping the current state alongside it.
pub struct TypedMonitor<M: SpecMonitor> {
    monitor: M,
    state: M::State,
}

impl<M: SpecMonitor> TypedMonitor<M> {
    pub fn new(monitor: M) -> Self {
        let state = monitor.initial_state();
        TypedMonitor { monitor, state }
    }
}

impl<M: SpecMonitor> ObservingMonitor for TypedMonitor<M> {
    fn name(&self) -> &str {
        self.monitor.name()
    }

    fn observe(&mut self, event: &Event) {
        self.state = self.monitor.on_event(self.state, event);
    }

    fn is_hot(&self) -> bool {
        self.monitor.is_hot(self.state)
    }

    fn state_name(&self) -> String {
        format!("{:?}", self.state)
    }
}

/// The runtime's collection of active monitors plus the hot-state patience
/// bookkeeping needed for §4.6/§7's two liveness-violation triggers: a
/// monitor still hot when the iteration ends, or a monitor that stayed hot
/// for `liveness_temperature` consecutive schedule points mid-iteration.
pub struct MonitorSet {
    monitors: Vec<Box<dyn ObservingMonitor>>,
    /// Consecutive schedule points each monitor (by index) has spent hot.
    hot_streak: Vec<u32>,
}

impl MonitorSet {
    pub fn new() -> Self {
        MonitorSet {
            monitors: Vec::new(),
            hot_streak: Vec::new(),
        }
    }

    pub fn register(&mut self, monitor: Box<dyn ObservingMonitor>) {
        self.monitors.push(monitor);
        self.hot_streak.push(0);
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Deliver `monitor(event)` to every registered monitor.
    pub fn observe_all(&mut self, event: &Event) {
        for monitor in &mut self.monitors {
            monitor.observe(event);
        }
    }

    /// Called once per schedule point; returns the name and state of the
    /// first monitor whose hot streak just reached `liveness_temperature`
    /// (§7 "Liveness violation ... schedule length exceeded while a hot
    /// state persists"), if any.
    pub fn tick(&mut self, liveness_temperature: u32) -> Option<(String, String)> {
        for (monitor, streak) in self.monitors.iter().zip(self.hot_streak.iter_mut()) {
            if monitor.is_hot() {
                *streak += 1;
                if *streak >= liveness_temperature {
                    return Some((monitor.name().to_string(), monitor.state_name()));
                }
            } else {
                *streak = 0;
            }
        }
        None
    }

    /// Called when an iteration ends with every operation `Completed`
    /// (§4.6, §7 "Deadlock ... " sibling check for liveness): the first
    /// monitor still in a hot state, if any.
    pub fn hot_at_end(&self) -> Option<(String, String)> {
        self.monitors
            .iter()
            .find(|m| m.is_hot())
            .map(|m| (m.name().to_string(), m.state_name()))
    }
}

impl Default for MonitorSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PingPongState {
        Idle,
        WaitPong,
    }

    struct PingPongMonitor;

    impl SpecMonitor for PingPongMonitor {
        type State = PingPongState;

        fn name(&self) -> &str {
            "PingPong"
        }

        fn initial_state(&self) -> PingPongState {
            PingPongState::Idle
        }

        fn is_hot(&self, state: PingPongState) -> bool {
            matches!(state, PingPongState::WaitPong)
        }

        fn on_event(&mut self, state: PingPongState, event: &Event) -> PingPongState {
            match (state, event.kind.as_str()) {
                (PingPongState::Idle, "Ping") => PingPongState::WaitPong,
                (PingPongState::WaitPong, "Pong") => PingPongState::Idle,
                (s, _) => s,
            }
        }
    }

    #[test]
    fn monitor_starts_cold() {
        let mut set = MonitorSet::new();
        set.register(Box::new(TypedMonitor::new(PingPongMonitor)));
        assert!(set.hot_at_end().is_none());
    }

    #[test]
    fn unanswered_ping_leaves_the_monitor_hot_at_end() {
        let mut set = MonitorSet::new();
        set.register(Box::new(TypedMonitor::new(PingPongMonitor)));
        set.observe_all(&Event::signal("Ping"));
        let (name, state) = set.hot_at_end().unwrap();
        assert_eq!(name, "PingPong");
        assert_eq!(state, "WaitPong");
    }

    #[test]
    fn a_matching_pong_cools_the_monitor_back_down() {
        let mut set = MonitorSet::new();
        set.register(Box::new(TypedMonitor::new(PingPongMonitor)));
        set.observe_all(&Event::signal("Ping"));
        set.observe_all(&Event::signal("Pong"));
        assert!(set.hot_at_end().is_none());
    }

    #[test]
    fn tick_reports_the_monitor_once_its_hot_streak_hits_the_temperature() {
        let mut set = MonitorSet::new();
        set.register(Box::new(TypedMonitor::new(PingPongMonitor)));
        set.observe_all(&Event::signal("Ping"));
        assert!(set.tick(3).is_none());
        assert!(set.tick(3).is_none());
        let hit = set.tick(3);
        assert_eq!(hit.unwrap().0, "PingPong");
    }

    #[test]
    fn cooling_down_resets_the_hot_streak() {
        let mut set = MonitorSet::new();
        set.register(Box::new(TypedMonitor::new(PingPongMonitor)));
        set.observe_all(&Event::signal("Ping"));
        set.tick(5);
        set.observe_all(&Event::signal("Pong"));
        assert!(set.tick(1).is_none());
    }
}
