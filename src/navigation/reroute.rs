use crate::models::NavigationState;
use std::time::Duration;
use tokio::time::Instant;

/// Decides when an off-route driver gets a new route.
///
/// At most one attempt is outstanding, and attempts are spaced by the throttle
/// measured from when the previous one was triggered.
#[derive(Debug, Clone)]
pub struct RerouteController {
    throttle: Duration,
    last_attempt_at: Option<Instant>,
    outstanding: bool,
}

impl RerouteController {
    pub fn new(throttle: Duration) -> Self {
        RerouteController {
            throttle,
            last_attempt_at: None,
            outstanding: false,
        }
    }

    /// Returns true, and records the attempt, when a reroute should fire now.
    pub fn should_attempt(&mut self, state: NavigationState, now: Instant) -> bool {
        if state != NavigationState::OffRoute || self.outstanding {
            return false;
        }
        if let Some(last) = self.last_attempt_at {
            if now.saturating_duration_since(last) < self.throttle {
                return false;
            }
        }
        self.last_attempt_at = Some(now);
        self.outstanding = true;
        true
    }

    /// The outstanding attempt finished, whatever its outcome.
    pub fn settle(&mut self) {
        self.outstanding = false;
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    /// Time until the next attempt is allowed, if throttled at `now`.
    pub fn throttled_for(&self, now: Instant) -> Option<Duration> {
        let last = self.last_attempt_at?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.throttle).then(|| self.throttle - elapsed)
    }
}
