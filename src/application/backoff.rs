//! Bounded exponential backoff for reconnect attempts.

use std::time::Duration;

/// Delay bounds for reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// Doubling delay sequence capped at `max`.
///
/// `initial, 2*initial, 4*initial, ... max, max, ...` until `reset`.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next: Duration,
    last: Option<Duration>,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        let initial = policy.initial.min(policy.max);
        Self {
            policy: BackoffPolicy {
                initial,
                max: policy.max,
            },
            next: initial,
            last: None,
            attempts: 0,
        }
    }

    /// Returns the delay before the next attempt and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.policy.max);
        self.attempts = self.attempts.saturating_add(1);
        self.last = Some(delay);
        delay
    }

    /// True once the last delay handed out was the ceiling itself.
    pub fn at_ceiling(&self) -> bool {
        self.last.is_some_and(|delay| delay >= self.policy.max)
    }

    /// Attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.next = self.policy.initial;
        self.last = None;
        self.attempts = 0;
    }
}
