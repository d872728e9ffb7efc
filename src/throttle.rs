//! Temporal de-duplication of audio feedback.
//!
//! Two rate limiters share one state value:
//! - per-label announcement cooldown (a person seen on thirty consecutive
//!   frames is spoken once per window, not thirty times)
//! - one global proximity-alert cooldown, shared across labels, so rapid
//!   alternation between two near objects does not double the tone rate
//!
//! The state is owned by the pipeline and threaded through each tick; it is
//! never ambient process state, so independent pipelines cannot interfere.
//! Timestamps are only ever overwritten with a later `now`, so they are
//! monotonically non-decreasing per label and globally.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct ThrottleState {
    last_announced: HashMap<String, Instant>,
    last_alert: Option<Instant>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a spatial announcement for `label` may fire at `now`,
    /// recording `now` when it does.
    ///
    /// Fires when the label has never been announced or strictly more than
    /// `cooldown` has elapsed. A call exactly at the cooldown boundary does
    /// not fire.
    pub fn try_announce(&mut self, label: &str, now: Instant, cooldown: Duration) -> bool {
        let fire = match self.last_announced.get(label) {
            Some(&last) => now.duration_since(last) > cooldown,
            None => true,
        };
        if fire {
            self.last_announced.insert(label.to_string(), now);
        }
        fire
    }

    /// Decide whether the proximity tone may fire at `now`, recording `now`
    /// when it does. Global: all labels share the one cooldown.
    pub fn try_alert(&mut self, now: Instant, cooldown: Duration) -> bool {
        let fire = match self.last_alert {
            Some(last) => now.duration_since(last) > cooldown,
            None => true,
        };
        if fire {
            self.last_alert = Some(now);
        }
        fire
    }

    /// Number of labels currently tracked (bounded by the allow-list).
    pub fn tracked_labels(&self) -> usize {
        self.last_announced.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(5000);

    #[test]
    fn first_announcement_fires() {
        let mut state = ThrottleState::new();
        assert!(state.try_announce("person", Instant::now(), COOLDOWN));
    }

    #[test]
    fn boundary_call_does_not_fire() {
        let mut state = ThrottleState::new();
        let t0 = Instant::now();
        assert!(state.try_announce("person", t0, COOLDOWN));

        // Exactly at the cooldown: held back.
        assert!(!state.try_announce("person", t0 + Duration::from_millis(5000), COOLDOWN));
        // One millisecond past it: fires.
        assert!(state.try_announce("person", t0 + Duration::from_millis(5001), COOLDOWN));
    }

    #[test]
    fn suppressed_call_does_not_reset_the_window() {
        let mut state = ThrottleState::new();
        let t0 = Instant::now();
        assert!(state.try_announce("person", t0, COOLDOWN));
        assert!(!state.try_announce("person", t0 + Duration::from_millis(4000), COOLDOWN));
        // Still measured from t0, not from the suppressed call.
        assert!(state.try_announce("person", t0 + Duration::from_millis(5001), COOLDOWN));
    }

    #[test]
    fn labels_have_independent_announcement_windows() {
        let mut state = ThrottleState::new();
        let t0 = Instant::now();
        assert!(state.try_announce("person", t0, COOLDOWN));
        assert!(state.try_announce("dog", t0 + Duration::from_millis(10), COOLDOWN));
        assert_eq!(state.tracked_labels(), 2);
    }

    #[test]
    fn alert_cooldown_is_shared_across_labels() {
        let mut state = ThrottleState::new();
        let t0 = Instant::now();
        let cooldown = Duration::from_millis(1000);

        // Near person fires the tone; a near dog ten ms later is inside the
        // same global window.
        assert!(state.try_alert(t0, cooldown));
        assert!(!state.try_alert(t0 + Duration::from_millis(10), cooldown));
        assert!(state.try_alert(t0 + Duration::from_millis(1001), cooldown));
    }
}
