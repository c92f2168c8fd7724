//! pool::retry
//!
//! Bounded retry policy for publish conflicts.

use std::time::Duration;

/// Default number of attempts per claim or release.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default spacing between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay every time.
    #[default]
    Fixed,
    /// Doubling delay, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Retry configuration for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub retry_delay: Duration,
    pub backoff: Backoff,
    /// Retry on an empty pool instead of failing right away.
    pub wait_for_lock: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
            wait_for_lock: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_attempts` times without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Attempts to make, never zero.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.retry_delay,
            Backoff::Exponential { max_delay } => {
                let shift = attempt.saturating_sub(1).min(31);
                self.retry_delay
                    .checked_mul(1u32 << shift)
                    .unwrap_or(max_delay)
                    .min(max_delay)
            }
        }
    }
}
