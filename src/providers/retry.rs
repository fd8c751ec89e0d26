//! Retry timing for the coordinator.
//!
//! Two delays apply between attempts:
//!
//! - switching to a fallback provider waits an exponential backoff,
//!   `backoff_base * 2^attempt` (attempt is 0-indexed);
//! - retrying the same provider waits a fixed `retry_delay`.
//!
//! The attempt budget itself comes from [`RequestOptions::retry_count`](crate::RequestOptions).

use std::time::Duration;

use serde::Deserialize;

/// Delay configuration between coordinator attempts.
///
/// ```rust
/// # use consilium::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::new()
///     .backoff_base(Duration::from_millis(200))
///     .retry_delay(Duration::from_millis(50));
/// assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Base of the exponential backoff before switching providers. Default: 1s.
    #[serde(rename = "backoff_base_ms", deserialize_with = "crate::serde_util::duration_ms")]
    pub backoff_base: Duration,
    /// Fixed delay before retrying the same provider. Default: 1s.
    #[serde(rename = "retry_delay_ms", deserialize_with = "crate::serde_util::duration_ms")]
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with no waiting between attempts.
    pub fn immediate() -> Self {
        Self {
            backoff_base: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Backoff before switching to a fallback after `attempt` failed (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for_attempt(40), Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn immediate_never_waits() {
        let policy = RetryPolicy::immediate();
        assert_eq!(policy.backoff_for_attempt(3), Duration::ZERO);
        assert_eq!(policy.retry_delay, Duration::ZERO);
    }

    #[test]
    fn parses_millisecond_fields() {
        let policy: RetryPolicy = toml::from_str("backoff_base_ms = 250").unwrap();
        assert_eq!(policy.backoff_base, Duration::from_millis(250));
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
    }
}
