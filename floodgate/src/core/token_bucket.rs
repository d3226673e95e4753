//! Token bucket rate limiting
//!
//! A capacity-bounded token count drains by exactly one per admitted
//! request and refills continuously at a fixed rate. Tokens are fractional
//! internally; only admission consumes whole units. Refill is computed from
//! elapsed time, not discretized into ticks, so behavior is independent of
//! how often decisions are requested.

use super::config::RateLimitConfig;
use super::limiter::Decision;
use super::store::{ShardedStore, ShardedStoreBuilder};

// A bucket left alone for this many full refill periods is back at
// capacity and indistinguishable from fresh state, so it can be reclaimed.
const IDLE_REFILLS: u64 = 3;

/// Per-key bucket state
#[derive(Debug, Clone, Copy)]
pub struct TokenBucketState {
    tokens: f64,
    last_refill_ms: u64,
}

/// Token bucket limiter over a sharded per-key store
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    store: ShardedStore<TokenBucketState>,
}

impl TokenBucketLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store_tuning(config, ShardedStoreBuilder::new())
    }

    /// Create a limiter with custom store capacity/sharding
    pub fn with_store_tuning(config: &RateLimitConfig, store: ShardedStoreBuilder) -> Self {
        let full_refill_ms =
            (f64::from(config.bucket_capacity) / config.refill_per_sec * 1000.0).ceil() as u64;
        TokenBucketLimiter {
            capacity: f64::from(config.bucket_capacity),
            refill_per_sec: config.refill_per_sec,
            store: store
                .idle_after_ms(full_refill_ms.saturating_mul(IDLE_REFILLS).max(1000))
                .build(),
        }
    }

    /// Decide admission for `key` at `now_ms`
    pub fn check(&self, key: &str, now_ms: u64) -> Decision {
        let capacity = self.capacity;
        let refill_per_sec = self.refill_per_sec;
        self.store.with_state(
            key,
            now_ms,
            || TokenBucketState {
                tokens: capacity,
                last_refill_ms: now_ms,
            },
            |state| {
                let elapsed_ms = now_ms.saturating_sub(state.last_refill_ms);
                state.tokens =
                    (state.tokens + elapsed_ms as f64 / 1000.0 * refill_per_sec).min(capacity);
                state.last_refill_ms = now_ms;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    let reset_in_ms = if state.tokens >= capacity {
                        0
                    } else {
                        // time until one more whole token accrues
                        ms_for_tokens(1.0 - state.tokens.fract(), refill_per_sec)
                    };
                    return Decision {
                        allowed: true,
                        remaining: state.tokens.floor() as u64,
                        retry_after_ms: 0,
                        reset_in_ms,
                    };
                }

                // under one token: the refill above is the only mutation
                let retry_after_ms = ms_for_tokens(1.0 - state.tokens, refill_per_sec);
                Decision {
                    allowed: false,
                    remaining: 0,
                    retry_after_ms,
                    reset_in_ms: retry_after_ms,
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

fn ms_for_tokens(tokens: f64, refill_per_sec: f64) -> u64 {
    (tokens / refill_per_sec * 1000.0).ceil() as u64
}
