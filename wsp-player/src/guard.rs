//! Interaction Guard
//!
//! Marks "a local human gesture is in flight" for a short window so that
//! corrective seeks triggered by peers (or by our own update coming back
//! around) don't fight a user who is scrubbing.
//!
//! The guard is purely time-based because the channel has no delivery
//! acknowledgement. It is a two-state machine over a monotonic deadline:
//!
//! ```text
//! Idle --begin()--> Armed{deadline}
//! Armed --begin()--> Armed{later deadline}
//! Armed --expire(now >= deadline)--> Idle
//! ```
//!
//! The owner schedules expiry by sleeping until [`InteractionGuard::deadline`]
//! and re-creates that sleep whenever the deadline moves, which makes re-arming
//! a cancel-and-reschedule.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Armed { deadline: Instant },
}

/// Time-windowed "interaction in flight" flag
#[derive(Debug, Clone)]
pub struct InteractionGuard {
    window: Duration,
    state: GuardState,
}

impl InteractionGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: GuardState::Idle,
        }
    }

    /// Arm the guard, or push its deadline out if already armed
    pub fn begin(&mut self, now: Instant) {
        let deadline = now + self.window;
        if let GuardState::Armed { .. } = self.state {
            debug!("Interaction guard re-armed");
        } else {
            debug!("Interaction guard armed for {:?}", self.window);
        }
        self.state = GuardState::Armed { deadline };
    }

    /// True while a gesture may still override remote corrections
    pub fn is_active(&self, now: Instant) -> bool {
        match self.state {
            GuardState::Armed { deadline } => now < deadline,
            GuardState::Idle => false,
        }
    }

    /// Pending expiry, if armed
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            GuardState::Armed { deadline } => Some(deadline),
            GuardState::Idle => None,
        }
    }

    /// Disarm if the window has elapsed; returns true on the Armed → Idle transition
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            GuardState::Armed { deadline } if now >= deadline => {
                self.state = GuardState::Idle;
                debug!("Interaction guard expired");
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_starts_idle() {
        let guard = InteractionGuard::new(WINDOW);
        let now = Instant::now();
        assert_eq!(guard.state(), GuardState::Idle);
        assert!(!guard.is_active(now));
        assert!(guard.deadline().is_none());
    }

    #[test]
    fn test_active_strictly_before_deadline() {
        let mut guard = InteractionGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.begin(t0);

        assert!(guard.is_active(t0));
        assert!(guard.is_active(t0 + Duration::from_millis(299)));
        assert!(!guard.is_active(t0 + WINDOW));
        assert_eq!(guard.deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_rearm_extends_window() {
        let mut guard = InteractionGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.begin(t0);
        guard.begin(t0 + Duration::from_millis(200));

        // Would have expired under the first arm
        let t1 = t0 + Duration::from_millis(350);
        assert!(guard.is_active(t1));
        assert!(!guard.expire(t1));
        assert!(guard.expire(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_expire_transitions_once() {
        let mut guard = InteractionGuard::new(WINDOW);
        let t0 = Instant::now();
        guard.begin(t0);

        assert!(!guard.expire(t0 + Duration::from_millis(100)));
        assert!(guard.expire(t0 + WINDOW));
        assert_eq!(guard.state(), GuardState::Idle);
        assert!(!guard.expire(t0 + WINDOW * 2));
    }
}
