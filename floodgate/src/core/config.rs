//! Global rate limit configuration
//!
//! One immutable configuration applies to every key; per-key overrides are
//! out of scope. The engine validates the configuration at construction and
//! refuses to serve decisions under an invalid one.

use super::LimitError;

/// Configuration shared by all three algorithms
///
/// `limit` and `window_ms` parameterize the fixed and sliding window
/// algorithms; `bucket_capacity` and `refill_per_sec` parameterize the
/// token bucket.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per window
    pub limit: u32,
    /// Window duration in milliseconds
    pub window_ms: u64,
    /// Maximum tokens the bucket can hold
    pub bucket_capacity: u32,
    /// Continuous refill rate in tokens per second
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            limit: 100,
            window_ms: 60_000,
            bucket_capacity: 100,
            refill_per_sec: 1.0,
        }
    }
}

impl RateLimitConfig {
    /// Check every field is positive (and the refill rate finite)
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.limit == 0 {
            return Err(LimitError::InvalidConfig("limit must be positive"));
        }
        if self.window_ms == 0 {
            return Err(LimitError::InvalidConfig("window_ms must be positive"));
        }
        if self.bucket_capacity == 0 {
            return Err(LimitError::InvalidConfig("bucket_capacity must be positive"));
        }
        if !self.refill_per_sec.is_finite() || self.refill_per_sec <= 0.0 {
            return Err(LimitError::InvalidConfig(
                "refill_per_sec must be positive and finite",
            ));
        }
        Ok(())
    }
}
