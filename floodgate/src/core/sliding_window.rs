//! Sliding window (log-based) rate limiting
//!
//! Tracks the timestamp of every admitted request in a continuously moving
//! trailing interval. After being blocked, capacity returns only once the
//! oldest entry ages out of the window: gradually, never via a sudden
//! reset. Most bookkeeping of the three algorithms.

use std::collections::VecDeque;

use super::config::RateLimitConfig;
use super::limiter::Decision;
use super::store::{ShardedStore, ShardedStoreBuilder};

const IDLE_WINDOWS: u64 = 3;

/// Per-key admission timestamps, oldest first
///
/// Entries are appended in arrival order, so the sequence is time-ordered
/// by construction and expired entries are always at the front.
#[derive(Debug, Default)]
pub struct SlidingWindowState {
    timestamps: VecDeque<u64>,
}

/// Sliding window limiter over a sharded per-key store
pub struct SlidingWindowLimiter {
    limit: u32,
    window_ms: u64,
    store: ShardedStore<SlidingWindowState>,
}

impl SlidingWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store_tuning(config, ShardedStoreBuilder::new())
    }

    /// Create a limiter with custom store capacity/sharding
    pub fn with_store_tuning(config: &RateLimitConfig, store: ShardedStoreBuilder) -> Self {
        SlidingWindowLimiter {
            limit: config.limit,
            window_ms: config.window_ms,
            store: store
                .idle_after_ms(config.window_ms.saturating_mul(IDLE_WINDOWS))
                .build(),
        }
    }

    /// Decide admission for `key` at `now_ms`
    ///
    /// Purge and admission test run as one critical section relative to
    /// other callers on the same key.
    pub fn check(&self, key: &str, now_ms: u64) -> Decision {
        let limit = self.limit as usize;
        let window_ms = self.window_ms;
        self.store.with_state(
            key,
            now_ms,
            SlidingWindowState::default,
            |state| {
                while let Some(&oldest) = state.timestamps.front() {
                    if now_ms.saturating_sub(oldest) > window_ms {
                        state.timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                if state.timestamps.len() >= limit {
                    // earliest moment capacity can return: the oldest entry
                    // falling out of the trailing window
                    let oldest = state.timestamps.front().copied().unwrap_or(now_ms);
                    let retry_after_ms =
                        window_ms.saturating_sub(now_ms.saturating_sub(oldest));
                    return Decision {
                        allowed: false,
                        remaining: 0,
                        retry_after_ms,
                        reset_in_ms: retry_after_ms,
                    };
                }

                state.timestamps.push_back(now_ms);
                Decision {
                    allowed: true,
                    remaining: (limit - state.timestamps.len()) as u64,
                    retry_after_ms: 0,
                    // the entry just inserted falls out one full window from now
                    reset_in_ms: window_ms,
                }
            },
        )
    }

    /// Evict state for keys idle past the retention threshold
    pub fn sweep_idle(&self, now_ms: u64) -> usize {
        self.store.sweep_idle(now_ms)
    }

    /// Keys currently holding state
    pub fn active_keys(&self) -> usize {
        self.store.len()
    }
}
