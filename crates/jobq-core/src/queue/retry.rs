//! Retry policy: decides backoff delays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff before a failed job re-enters its queue.
///
/// `delay = base_delay_ms * multiplier^(attempts - 1)`. The default is a fixed
/// 5000 ms backoff (multiplier 1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(default_base_delay_ms()))
    }
}

impl RetryPolicy {
    /// Same delay before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay_ms: duration_ms(delay),
            multiplier: 1.0,
        }
    }

    pub fn exponential(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay_ms: duration_ms(base_delay),
            multiplier,
        }
    }

    /// Delay before the retry that follows attempt number `attempts` (1-indexed).
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.max(0.0).powi(exponent);
        if delay_ms.is_finite() {
            Duration::from_millis(delay_ms as u64)
        } else {
            Duration::from_millis(u64::MAX)
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_is_fixed_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_ms, 5_000);
        assert_eq!(policy.multiplier, 1.0);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(10)]
    fn fixed_policy_never_grows(#[case] attempts: u32) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(attempts), Duration::from_millis(5_000));
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::exponential(Duration::from_secs(2), 2.0);

        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"multiplier": 3.0}"#).unwrap();
        assert_eq!(policy.base_delay_ms, 5_000);
        assert_eq!(policy.multiplier, 3.0);
    }
}
