//! Retry backoff schedule for transient item failures.

use chrono::{DateTime, Duration, Utc};

/// Base delay before the first retry.
const BASE_DELAY_SECS: i64 = 30;

/// Upper bound on the retry delay.
const MAX_DELAY_SECS: i64 = 3600;

/// Maximum jitter added on top of the computed delay.
const JITTER_MS: i64 = 2000;

/// Delay in seconds before attempt `attempt + 1` may run.
///
/// Capped exponential: 30s, 60s, 120s, ... up to one hour.
#[must_use]
pub fn delay_secs(attempt: i32) -> i64 {
    let exponent = attempt.max(1) - 1;
    let factor = 2i64.checked_pow(exponent.min(30) as u32).unwrap_or(i64::MAX);
    BASE_DELAY_SECS.saturating_mul(factor).min(MAX_DELAY_SECS)
}

/// Timestamp at which a transiently failed item becomes claimable again.
///
/// `attempt` is the number of attempts completed including the failing
/// one. A small jitter spreads concurrent retries apart.
#[must_use]
pub fn next_attempt_at(attempt: i32) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(delay_secs(attempt)) + Duration::milliseconds(jitter_ms())
}

/// Pseudo-random jitter in milliseconds derived from the clock.
fn jitter_ms() -> i64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    i64::from(nanos) % JITTER_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_growth() {
        assert_eq!(delay_secs(1), 30);
        assert_eq!(delay_secs(2), 60);
        assert_eq!(delay_secs(3), 120);
        assert_eq!(delay_secs(4), 240);
    }

    #[test]
    fn test_delay_is_capped() {
        assert_eq!(delay_secs(10), MAX_DELAY_SECS);
        assert_eq!(delay_secs(100), MAX_DELAY_SECS);
    }

    #[test]
    fn test_zero_and_negative_attempts_use_base() {
        assert_eq!(delay_secs(0), 30);
        assert_eq!(delay_secs(-5), 30);
    }

    #[test]
    fn test_next_attempt_is_in_the_future() {
        let at = next_attempt_at(1);
        assert!(at > Utc::now());
        assert!(at <= Utc::now() + Duration::seconds(35));
    }
}
