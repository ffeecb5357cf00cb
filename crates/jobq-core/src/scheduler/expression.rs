//! Schedule expressions.
//!
//! Only a closed set of expressions is understood, each mapped to a fixed
//! interval. This is not a calendar scheduler: `daily` means "every 24h from
//! registration", not "at midnight".

use std::time::Duration;

/// A recognized schedule expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownSchedule {
    EveryMinute,
    Hourly,
    Daily,
    Weekly,
}

impl KnownSchedule {
    /// Match an expression against the table. Surrounding whitespace is
    /// ignored, everything else must match exactly.
    pub fn parse(expression: &str) -> Option<Self> {
        match expression.trim() {
            "* * * * *" | "every minute" => Some(Self::EveryMinute),
            "hourly" | "@hourly" | "0 * * * *" => Some(Self::Hourly),
            "daily" | "@daily" | "0 0 * * *" => Some(Self::Daily),
            "weekly" | "@weekly" | "0 0 * * 0" => Some(Self::Weekly),
            _ => None,
        }
    }

    pub fn interval(self) -> Duration {
        const MINUTE: u64 = 60_000;
        let ms = match self {
            Self::EveryMinute => MINUTE,
            Self::Hourly => 60 * MINUTE,
            Self::Daily => 24 * 60 * MINUTE,
            Self::Weekly => 7 * 24 * 60 * MINUTE,
        };
        Duration::from_millis(ms)
    }
}

/// Shortest interval a timer can run at; tokio rejects a zero period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Interval for `expression`, or `default` when it is not in the table.
/// Never shorter than [`MIN_INTERVAL`].
pub fn resolve_interval(expression: &str, default: Duration) -> Duration {
    KnownSchedule::parse(expression)
        .map(KnownSchedule::interval)
        .unwrap_or(default)
        .max(MIN_INTERVAL)
}
