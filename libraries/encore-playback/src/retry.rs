//! Per-track retry bookkeeping

use std::time::Duration;

/// What to do after a failed load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reload the same resource after `delay`
    RetryAfter { attempt: u32, delay: Duration },
    /// Terminal for this track
    Exhausted { attempts: u32 },
}

/// Failed loads of the current track
///
/// `attempt` counts failures. A track is loaded at most `max_attempts`
/// times: every failure but the last schedules a reload after
/// `attempt * base_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryState {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Record one failed load
    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt = self.attempt.saturating_add(1);
        if self.attempt < self.max_attempts {
            RetryDecision::RetryAfter {
                attempt: self.attempt,
                delay: self.base_delay.saturating_mul(self.attempt),
            }
        } else {
            RetryDecision::Exhausted {
                attempts: self.attempt,
            }
        }
    }
}
