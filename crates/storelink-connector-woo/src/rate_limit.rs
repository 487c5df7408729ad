//! Outbound rate limiting for the WooCommerce connector.
//!
//! A single token bucket plus a concurrency semaphore bound the request
//! rate against the store, which is typically shared hosting with strict
//! limits.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, trace};

/// Configuration for rate limiting behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum requests per second.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum concurrent requests.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_max_concurrent() -> u32 {
    4
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_second: default_requests_per_second(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl RateLimitConfig {
    /// Disable rate limiting (tests, local stores).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Token bucket state.
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(tokens_per_second: u32) -> Self {
        Self {
            tokens: f64::from(tokens_per_second),
            max_tokens: f64::from(tokens_per_second),
            refill_rate: f64::from(tokens_per_second),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
        self.tokens = (self.tokens + new_tokens).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Try to take one token; on failure returns the wait until one frees up.
    fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(needed / self.refill_rate))
        }
    }
}

/// Rate limiter guarding outbound requests to one store.
pub struct RateLimiter {
    config: RateLimitConfig,
    semaphore: Arc<Semaphore>,
    tokens: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent as usize));
        let tokens = Arc::new(Mutex::new(TokenBucket::new(config.requests_per_second)));
        Self {
            config,
            semaphore,
            tokens,
        }
    }

    /// Acquire permission for one outbound request.
    ///
    /// Waits until both a concurrency permit and a rate token are
    /// available. The returned guard releases the permit when dropped.
    pub async fn acquire(&self) -> RateLimitGuard {
        if !self.config.enabled {
            return RateLimitGuard { _permit: None };
        }

        // acquire_owned only fails if the semaphore is closed, which never
        // happens here; retry defensively rather than panic.
        let permit = loop {
            match self.semaphore.clone().acquire_owned().await {
                Ok(p) => break p,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };

        loop {
            let wait = {
                let mut bucket = self.tokens.lock().await;
                bucket.try_acquire().err()
            };
            match wait {
                None => {
                    trace!("rate limit token acquired");
                    return RateLimitGuard {
                        _permit: Some(permit),
                    };
                }
                Some(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "rate limited, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Guard holding one in-flight-request permit.
pub struct RateLimitGuard {
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

/// Parse a Retry-After header value in delay-seconds format.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.requests_per_second, 10);
        assert_eq!(config.max_concurrent, 4);
    }

    #[test]
    fn test_token_bucket_depletes() {
        let mut bucket = TokenBucket::new(1);
        assert!(bucket.try_acquire().is_ok());
        let result = bucket.try_acquire();
        assert!(result.is_err());
        assert!(result.unwrap_err().as_millis() > 0);
    }

    #[tokio::test]
    async fn test_disabled_limiter_is_passthrough() {
        let limiter = RateLimiter::new(RateLimitConfig::disabled());
        let _guard = limiter.acquire().await;
    }

    #[tokio::test]
    async fn test_guard_releases_permit_on_drop() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_second: 100,
            max_concurrent: 1,
        });

        let guard = limiter.acquire().await;
        assert_eq!(limiter.semaphore.available_permits(), 0);
        drop(guard);
        assert_eq!(limiter.semaphore.available_permits(), 1);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("invalid"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }
}
