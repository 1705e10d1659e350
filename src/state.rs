//! In-memory lifecycle state for each tracked space.
//!
//! The [`StateStore`] is the single owner of all mutable per-space state.
//! Every space gets its own async mutex so a probe racing a wake or restart
//! against the same space applies its read-modify-write as if serialized;
//! distinct spaces never contend. State lives for the life of the process
//! and resets on restart.

use crate::config::SpaceTarget;

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sentinel for timestamps that have never been set.
pub const NEVER: i64 = 0;

/// Normalized view of a space's reported lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Running,
    Idle,
    Transitioning,
    Unknown,
}

impl Classification {
    /// Short human description carried in the status snapshot.
    pub fn describe(self) -> &'static str {
        match self {
            Classification::Running => "running",
            Classification::Idle => "asleep (needs wake)",
            Classification::Transitioning => "building or starting",
            Classification::Unknown => "unreachable",
        }
    }
}

/// Mutable tracking state for one space.
#[derive(Debug)]
pub struct SpaceState {
    /// Consecutive probes classified idle; reset by any other classification
    /// and by a successful wake.
    pub consecutive_idle: u32,
    /// Epoch ms of the last successful wake, or [`NEVER`]. Gates the debounce.
    pub last_wake_ms: i64,
    /// Epoch ms of the most recent transition *into* running, or [`NEVER`].
    /// Changes only on that edge, never on later probes that still observe
    /// running, so `now - active_since_ms` is true continuous runtime rather
    /// than time since the last poll.
    pub active_since_ms: i64,
    /// Previous classification, used to detect the "became running" edge.
    pub last_classification: Classification,
}

impl SpaceState {
    fn new() -> Self {
        Self {
            consecutive_idle: 0,
            last_wake_ms: NEVER,
            active_since_ms: NEVER,
            last_classification: Classification::Unknown,
        }
    }

    /// Apply one parsed probe observation.
    ///
    /// Returns the derived uptime in ms when the space is running, `None`
    /// otherwise. The caller must hold this space's lock for the whole
    /// probe so concurrent observations cannot interleave.
    pub fn observe(&mut self, classification: Classification, now_ms: i64) -> Option<i64> {
        let uptime = match classification {
            Classification::Running => {
                if self.last_classification != Classification::Running {
                    self.active_since_ms = now_ms;
                }
                self.consecutive_idle = 0;
                Some(now_ms - self.active_since_ms)
            }
            Classification::Idle => {
                self.consecutive_idle += 1;
                None
            }
            Classification::Transitioning | Classification::Unknown => None,
        };
        self.last_classification = classification;
        uptime
    }

    /// Remaining debounce time in ms if a wake must currently be refused.
    pub fn wake_blocked_for(&self, now_ms: i64, window_ms: i64) -> Option<i64> {
        if self.last_wake_ms == NEVER {
            return None;
        }
        let elapsed = now_ms - self.last_wake_ms;
        if elapsed < window_ms {
            Some(window_ms - elapsed)
        } else {
            None
        }
    }

    /// Record a successful wake: arms the debounce and optimistically marks
    /// the space as freshly started (it is expected to reach running shortly).
    pub fn record_wake(&mut self, now_ms: i64) {
        self.last_wake_ms = now_ms;
        self.active_since_ms = now_ms;
        self.consecutive_idle = 0;
    }

    /// Record a successful restart. Restart is gated independently, so the
    /// wake debounce timer is left untouched.
    pub fn record_restart(&mut self, now_ms: i64) {
        self.active_since_ms = now_ms;
    }
}

/// Owner of all per-space state, keyed by the remote API identifier.
pub struct StateStore {
    states: HashMap<String, Arc<Mutex<SpaceState>>>,
}

impl StateStore {
    /// Create tracking state for every configured target.
    pub fn new(targets: &[SpaceTarget]) -> Self {
        let states = targets
            .iter()
            .map(|t| (t.space.clone(), Arc::new(Mutex::new(SpaceState::new()))))
            .collect();
        Self { states }
    }

    /// Handle to one space's state, or `None` for an unknown identifier.
    pub fn state(&self, space: &str) -> Option<Arc<Mutex<SpaceState>>> {
        self.states.get(space).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Classification::*;

    fn store_with_one() -> StateStore {
        let target = SpaceTarget {
            name: "t".into(),
            region: String::new(),
            url: "https://t.example".into(),
            space: "acme/t".into(),
            description: String::new(),
        };
        StateStore::new(&[target])
    }

    #[test]
    fn test_active_since_set_once_per_running_streak() {
        let mut st = SpaceState::new();
        // [idle, idle, running, running, idle]
        assert_eq!(st.observe(Idle, 1_000), None);
        assert_eq!(st.consecutive_idle, 1);
        assert_eq!(st.observe(Idle, 2_000), None);
        assert_eq!(st.consecutive_idle, 2);

        assert_eq!(st.observe(Running, 3_000), Some(0));
        assert_eq!(st.active_since_ms, 3_000);
        assert_eq!(st.consecutive_idle, 0);

        // Still running: active_since must NOT move
        assert_eq!(st.observe(Running, 5_000), Some(2_000));
        assert_eq!(st.active_since_ms, 3_000);
        assert_eq!(st.consecutive_idle, 0);

        assert_eq!(st.observe(Idle, 6_000), None);
        assert_eq!(st.consecutive_idle, 1);
    }

    #[test]
    fn test_running_edge_rearms_after_interruption() {
        let mut st = SpaceState::new();
        st.observe(Running, 1_000);
        st.observe(Idle, 2_000);
        st.observe(Running, 3_000);
        assert_eq!(st.active_since_ms, 3_000);
    }

    #[test]
    fn test_transitioning_and_unknown_leave_counters_alone() {
        let mut st = SpaceState::new();
        st.observe(Idle, 1_000);
        st.observe(Transitioning, 2_000);
        assert_eq!(st.consecutive_idle, 1);
        st.observe(Unknown, 3_000);
        assert_eq!(st.consecutive_idle, 1);
        assert_eq!(st.active_since_ms, NEVER);
        assert_eq!(st.last_classification, Unknown);
    }

    #[test]
    fn test_wake_debounce_window() {
        let window = 600_000;
        let mut st = SpaceState::new();
        assert!(st.wake_blocked_for(1_000, window).is_none());

        st.record_wake(10_000);
        assert_eq!(st.last_wake_ms, 10_000);
        assert_eq!(st.active_since_ms, 10_000);

        // Inside the window: blocked, and the timestamp is untouched
        assert_eq!(st.wake_blocked_for(10_000 + 1, window), Some(window - 1));
        assert_eq!(st.last_wake_ms, 10_000);

        // At the boundary the window has elapsed
        assert!(st.wake_blocked_for(10_000 + window, window).is_none());
    }

    #[test]
    fn test_restart_does_not_arm_wake_debounce() {
        let mut st = SpaceState::new();
        st.record_restart(42_000);
        assert_eq!(st.active_since_ms, 42_000);
        assert_eq!(st.last_wake_ms, NEVER);
        assert!(st.wake_blocked_for(43_000, 600_000).is_none());
    }

    #[test]
    fn test_store_lookup() {
        let store = store_with_one();
        assert!(store.state("acme/t").is_some());
        assert!(store.state("acme/other").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_observations_never_lose_an_increment() {
        let store = Arc::new(store_with_one());
        let mut handles = Vec::new();
        for i in 0..2 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let state = store.state("acme/t").unwrap();
                let mut st = state.lock().await;
                st.observe(Idle, 1_000 + i);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let state = store.state("acme/t").unwrap();
        assert_eq!(state.lock().await.consecutive_idle, 2);
    }
}
