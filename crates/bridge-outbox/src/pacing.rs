//! Delay between drain cycles after a failed attempt.

use bridge_config_and_utils::{BackoffKind, Config};
use std::time::Duration;

/// Global retry pacing. Applies to the whole drain loop, not per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPacing {
    /// Same delay after every failure.
    Fixed(Duration),
    /// `base * 2^(n-1)` for the n-th consecutive failure, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl RetryPacing {
    pub fn from_config(config: &Config) -> Self {
        match config.backoff {
            BackoffKind::Fixed => Self::Fixed(config.retry_delay()),
            BackoffKind::Exponential => Self::Exponential {
                base: config.retry_delay(),
                max: config.max_retry_delay(),
            },
        }
    }

    /// No delay at all. Used by tests and one-shot drains.
    pub fn none() -> Self {
        Self::Fixed(Duration::ZERO)
    }

    /// Delay to wait after `consecutive_failures` failed attempts in a row.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let base_ms = base.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                let shift = consecutive_failures.saturating_sub(1);
                let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
                Duration::from_millis(base_ms.saturating_mul(multiplier).min(max_ms))
            }
        }
    }
}

impl Default for RetryPacing {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(5))
    }
}
