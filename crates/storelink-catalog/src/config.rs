//! Engine configuration.

use rust_decimal::Decimal;

/// Maximum length of an error hint persisted or returned to callers.
pub const MAX_HINT_LEN: usize = 500;

/// Tunable settings for the synchronization engine.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Maximum execution attempts per run item before it becomes `DEAD`.
    pub max_attempts: i32,

    /// Number of items one worker invocation processes concurrently.
    pub worker_concurrency: usize,

    /// Price deltas at or below this threshold downgrade an `UPDATE` to a
    /// `SKIP` with a warning. Zero means exact comparison.
    pub price_tolerance: Decimal,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            worker_concurrency: 4,
            price_tolerance: Decimal::ZERO,
        }
    }
}

impl CatalogConfig {
    /// Override the retry budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the price tolerance.
    #[must_use]
    pub fn with_price_tolerance(mut self, tolerance: Decimal) -> Self {
        self.price_tolerance = tolerance;
        self
    }
}

/// Truncate a hint string for transport and storage safety.
#[must_use]
pub fn truncate_hint(hint: &str) -> String {
    if hint.chars().count() <= MAX_HINT_LEN {
        hint.to_string()
    } else {
        hint.chars().take(MAX_HINT_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.worker_concurrency, 4);
        assert_eq!(config.price_tolerance, Decimal::ZERO);
    }

    #[test]
    fn test_truncate_hint_short_passthrough() {
        assert_eq!(truncate_hint("all good"), "all good");
    }

    #[test]
    fn test_truncate_hint_bounds_length() {
        let long = "x".repeat(2000);
        let truncated = truncate_hint(&long);
        assert_eq!(truncated.chars().count(), MAX_HINT_LEN);
    }

    #[test]
    fn test_truncate_hint_respects_char_boundaries() {
        let long = "é".repeat(600);
        let truncated = truncate_hint(&long);
        assert_eq!(truncated.chars().count(), MAX_HINT_LEN);
    }
}
