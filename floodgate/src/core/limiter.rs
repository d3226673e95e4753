//! Algorithm dispatch and the engine entry point
//!
//! [`RateLimiter`] holds one limiter per algorithm, each with its own
//! per-key state store, plus the injected [`Clock`]. Selection happens by
//! [`Algorithm`] value once per decision; unknown identifiers are rejected
//! when parsing the `Algorithm` itself, before any limiter state is
//! touched.

use std::fmt;
use std::str::FromStr;

use super::LimitError;
use super::clock::{Clock, SystemClock};
use super::config::RateLimitConfig;
use super::fixed_window::FixedWindowLimiter;
use super::sliding_window::SlidingWindowLimiter;
use super::store::ShardedStoreBuilder;
use super::token_bucket::TokenBucketLimiter;

/// Outcome of a single admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Quota or whole tokens left after this decision (0 when blocked)
    pub remaining: u64,
    /// Suggested minimum wait before the next attempt (0 when allowed)
    pub retry_after_ms: u64,
    /// Time until the next meaningful state change (window reset or refill tick)
    pub reset_in_ms: u64,
}

/// The three interchangeable admission-control algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

impl Algorithm {
    /// Wire identifiers accepted by the [`FromStr`] impl
    pub const IDENTIFIERS: [&'static str; 3] =
        ["FIXED_WINDOW", "SLIDING_WINDOW", "TOKEN_BUCKET"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::FixedWindow => "FIXED_WINDOW",
            Algorithm::SlidingWindow => "SLIDING_WINDOW",
            Algorithm::TokenBucket => "TOKEN_BUCKET",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED_WINDOW" => Ok(Algorithm::FixedWindow),
            "SLIDING_WINDOW" => Ok(Algorithm::SlidingWindow),
            "TOKEN_BUCKET" => Ok(Algorithm::TokenBucket),
            _ => Err(LimitError::InvalidAlgorithm(s.to_string())),
        }
    }
}

/// Admission-control engine dispatching to one of three algorithms
///
/// # Example
///
/// ```
/// use floodgate::{Algorithm, RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(RateLimitConfig::default()).unwrap();
/// let decision = limiter.check(Algorithm::FixedWindow, "user:42");
/// assert!(decision.allowed);
/// ```
pub struct RateLimiter<C: Clock = SystemClock> {
    fixed_window: FixedWindowLimiter,
    sliding_window: SlidingWindowLimiter,
    token_bucket: TokenBucketLimiter,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create an engine on the system clock
    ///
    /// Fails fast with [`LimitError::InvalidConfig`] on a non-positive
    /// limit, window, capacity, or refill rate.
    pub fn new(config: RateLimitConfig) -> Result<Self, LimitError> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a builder for tuning store capacity and sharding
    pub fn builder(config: RateLimitConfig) -> RateLimiterBuilder {
        RateLimiterBuilder::new(config)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create an engine with an injected clock
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Result<Self, LimitError> {
        RateLimiterBuilder::new(config).build_with_clock(clock)
    }

    /// Decide admission for `key` at the clock's current time
    pub fn check(&self, algorithm: Algorithm, key: &str) -> Decision {
        self.check_at(algorithm, key, self.clock.now_ms())
    }

    /// Decide admission for `key` at an explicit timestamp
    pub fn check_at(&self, algorithm: Algorithm, key: &str, now_ms: u64) -> Decision {
        match algorithm {
            Algorithm::FixedWindow => self.fixed_window.check(key, now_ms),
            Algorithm::SlidingWindow => self.sliding_window.check(key, now_ms),
            Algorithm::TokenBucket => self.token_bucket.check(key, now_ms),
        }
    }

    /// Evict state for keys idle past each limiter's retention threshold
    ///
    /// Returns the total number of evicted keys across the three stores.
    pub fn sweep_idle(&self, now_ms: u64) -> usize {
        self.fixed_window.sweep_idle(now_ms)
            + self.sliding_window.sweep_idle(now_ms)
            + self.token_bucket.sweep_idle(now_ms)
    }

    /// Keys currently holding state across the three stores
    pub fn active_keys(&self) -> usize {
        self.fixed_window.active_keys()
            + self.sliding_window.active_keys()
            + self.token_bucket.active_keys()
    }

    /// The engine's time source
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Builder for a [`RateLimiter`] with tuned per-key stores
///
/// # Example
///
/// ```
/// use floodgate::{RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::builder(RateLimitConfig::default())
///     .store_capacity(500_000)
///     .shard_count(64)
///     .build()
///     .unwrap();
/// assert_eq!(limiter.active_keys(), 0);
/// ```
pub struct RateLimiterBuilder {
    config: RateLimitConfig,
    store_capacity: usize,
    shard_count: usize,
}

impl RateLimiterBuilder {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiterBuilder {
            config,
            store_capacity: 1000,
            shard_count: 0,
        }
    }

    /// Expected number of unique keys per algorithm store
    pub fn store_capacity(mut self, capacity: usize) -> Self {
        self.store_capacity = capacity;
        self
    }

    /// Shards per store (0 selects a default from available parallelism)
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Build on the system clock
    pub fn build(self) -> Result<RateLimiter<SystemClock>, LimitError> {
        self.build_with_clock(SystemClock)
    }

    /// Build with an injected clock
    pub fn build_with_clock<C: Clock>(self, clock: C) -> Result<RateLimiter<C>, LimitError> {
        self.config.validate()?;
        let tuned = || {
            ShardedStoreBuilder::new()
                .capacity(self.store_capacity)
                .shard_count(self.shard_count)
        };
        Ok(RateLimiter {
            fixed_window: FixedWindowLimiter::with_store_tuning(&self.config, tuned()),
            sliding_window: SlidingWindowLimiter::with_store_tuning(&self.config, tuned()),
            token_bucket: TokenBucketLimiter::with_store_tuning(&self.config, tuned()),
            clock,
        })
    }
}
