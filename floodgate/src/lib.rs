//! # Floodgate
//!
//! An in-process admission-control engine for Rust: given a caller key and
//! the current time, decide whether to admit or reject the caller's next
//! request under one of three interchangeable rate-limiting algorithms.
//!
//! ## Algorithms
//!
//! - **Fixed window**: counts admissions in discrete, non-overlapping time
//!   slices. Cheapest bookkeeping; allows back-to-back bursts across a
//!   window boundary.
//! - **Sliding window**: tracks admission timestamps in a continuously
//!   moving trailing interval. Capacity returns gradually, never via a
//!   sudden reset.
//! - **Token bucket**: a capacity-bounded token count drains per admitted
//!   request and refills continuously at a fixed rate, independent of how
//!   often decisions are requested.
//!
//! ## Quick Start
//!
//! ```
//! use floodgate::{Algorithm, RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig {
//!     limit: 100,
//!     window_ms: 60_000,
//!     bucket_capacity: 10,
//!     refill_per_sec: 5.0,
//! })
//! .unwrap();
//!
//! let decision = limiter.check(Algorithm::TokenBucket, "user:123");
//! if decision.allowed {
//!     println!("admitted, {} tokens left", decision.remaining);
//! } else {
//!     println!("blocked, retry in {} ms", decision.retry_after_ms);
//! }
//! ```
//!
//! ## Deterministic time
//!
//! Every decision can be made at an explicit timestamp, and the engine's
//! own clock is injectable, so algorithm behavior is fully testable without
//! sleeping:
//!
//! ```
//! use floodgate::{Algorithm, ManualClock, RateLimitConfig, RateLimiter};
//!
//! let config = RateLimitConfig { limit: 2, window_ms: 1_000, ..Default::default() };
//! let limiter = RateLimiter::with_clock(config, ManualClock::new(0)).unwrap();
//!
//! assert!(limiter.check_at(Algorithm::FixedWindow, "k", 0).allowed);
//! assert!(limiter.check_at(Algorithm::FixedWindow, "k", 0).allowed);
//! assert!(!limiter.check_at(Algorithm::FixedWindow, "k", 0).allowed);
//! // past the window boundary the counter starts over
//! assert!(limiter.check_at(Algorithm::FixedWindow, "k", 1_001).allowed);
//! ```
//!
//! ## Concurrency
//!
//! The engine is `Sync`: per-key state lives in a sharded store with one
//! lock per shard, so decisions for the same key serialize while unrelated
//! keys proceed in parallel. Wrap the engine in an [`std::sync::Arc`] and
//! share it across threads or tasks.
//!
//! State for a key is created lazily on its first decision and evicted once
//! the key has been idle for several window (or full-refill) durations.
//! Call [`RateLimiter::sweep_idle`] from a background task, or rely on the
//! opportunistic per-shard sweeps that run during decisions.
//!
//! ## Features
//!
//! - `ahash` (default): use AHash for faster key hashing

pub mod core;

pub use crate::core::{
    Algorithm, Clock, Decision, FixedWindowLimiter, LimitError, ManualClock, RateLimitConfig,
    RateLimiter, RateLimiterBuilder, ShardedStore, ShardedStoreBuilder, SlidingWindowLimiter,
    SystemClock, TokenBucketLimiter,
};

// Re-export the store module so benchmarks can access it
pub use crate::core::store;
