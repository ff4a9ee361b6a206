use crate::constants::{BACKOFF_TIER_1, BACKOFF_TIER_2, BACKOFF_TIER_3};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Escalating wait applied after consecutive rate-limit responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackoffState {
    pub failure_count: u32,
    pub backoff_until: Option<Instant>,
}

/// Wait handed back to the UI after a rate-limit response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Backoff {
    pub backoff_seconds: u64,
}

impl BackoffState {
    /// Wait duration for the n-th consecutive rate-limit response (n >= 1).
    pub fn tier(failure_count: u32) -> Duration {
        match failure_count {
            0 => Duration::ZERO,
            1 => BACKOFF_TIER_1,
            2 => BACKOFF_TIER_2,
            _ => BACKOFF_TIER_3,
        }
    }

    pub fn record_rate_limit(&mut self, now: Instant) -> Backoff {
        self.failure_count = self.failure_count.saturating_add(1);
        let wait = Self::tier(self.failure_count);
        let until = now + wait;
        // Never move the deadline backwards.
        self.backoff_until = Some(self.backoff_until.map_or(until, |prev| prev.max(until)));

        Backoff {
            backoff_seconds: ceil_secs(wait),
        }
    }

    pub fn reset(&mut self) {
        *self = BackoffState::default();
    }

    /// Time left until requests may resume, if backing off at `now`.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.backoff_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }
}

pub(crate) fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(BackoffState::tier(1), Duration::from_secs(2));
        assert_eq!(BackoffState::tier(2), Duration::from_secs(5));
        assert_eq!(BackoffState::tier(3), Duration::from_secs(15));
        assert_eq!(BackoffState::tier(12), Duration::from_secs(15));
    }

    #[test]
    fn test_escalation_and_monotonic_deadline() {
        let mut state = BackoffState::default();
        let start = Instant::now();

        let waits: Vec<u64> = (0..5)
            .map(|i| {
                state
                    .record_rate_limit(start + Duration::from_millis(i * 100))
                    .backoff_seconds
            })
            .collect();
        assert_eq!(waits, vec![2, 5, 15, 15, 15]);
        assert_eq!(state.failure_count, 5);
    }

    #[test]
    fn test_deadline_never_decreases() {
        let mut state = BackoffState::default();
        let start = Instant::now();
        let mut previous = None;
        for i in 0..4 {
            state.record_rate_limit(start + Duration::from_secs(i));
            assert!(state.backoff_until >= previous);
            previous = state.backoff_until;
        }
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut state = BackoffState::default();
        let now = Instant::now();
        state.record_rate_limit(now);
        state.record_rate_limit(now);
        state.reset();
        assert_eq!(state.failure_count, 0);
        assert!(state.remaining(now).is_none());
        assert_eq!(state.record_rate_limit(now).backoff_seconds, 2);
    }

    #[test]
    fn test_remaining() {
        let mut state = BackoffState::default();
        let now = Instant::now();
        state.record_rate_limit(now);
        assert_eq!(state.remaining(now), Some(Duration::from_secs(2)));
        assert!(state.remaining(now + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_millis(1_200)), 2);
        assert_eq!(ceil_secs(Duration::from_secs(5)), 5);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
