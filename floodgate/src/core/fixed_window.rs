//! Fixed window rate limiting
//!
//! Counts admissions in discrete, non-overlapping windows of fixed
//! duration. The window resets lazily as part of the first decision that
//! lands past the boundary.
//!
//! Two full bursts of `limit` requests can be admitted within a span
//! shorter than the window if the first lands at the end of one window and
//! the second at the start of the next. This "double dip" is the defining
//! characteristic of fixed windows, not a bug.

use super::config::RateLimitConfig;
use super::limiter::Decision;
use super::store::{ShardedStore, ShardedStoreBuilder};

// Keys idle for this many windows have their state reclaimed.
const IDLE_WINDOWS: u64 = 3;

/// Per-key counter state for the current window
#[derive(Debug, Clone, Copy)]
pub struct FixedWindowState {
    window_start_ms: u64,
    count: u32,
}

/// Fixed window limiter over a sharded per-key store
pub struct FixedWindowLimiter {
    limit: u32,
    window_ms: u64,
    store: ShardedStore<FixedWindowState>,
}

impl FixedWindowLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store_tuning(config, ShardedStoreBuilder::new())
    }

    /// Create a limiter with custom store capacity/sharding
    ///
    /// The idle retention threshold is always derived from the window
    /// duration and overrides whatever the builder carries.
    pub fn with_store_tuning(config: &RateLimitConfig, store: ShardedStoreBuilder) -> Self {
        FixedWindowLimiter {
            limit: config.limit,
            window_ms: config.window_ms,
            store: store
                .idle_after_ms(config.window_ms.saturating_mul(IDLE_WINDOWS))
                .build(),
        }
    }

    /// Decide admission for `key` at `now_ms`
    pub fn check(&self, key: &str, now_ms: u64) -> Decision {
        let limit = self.limit;
        let window_ms = self.window_ms;
        self.store.with_state(
            key,
            now_ms,
            || FixedWindowState {
                window_start_ms: now_ms,
                count: 0,
            },
            |state| {
                let elapsed = now_ms.saturating_sub(state.window_start_ms);

                if elapsed > window_ms {
                    // window expired: reset and admit in one step
                    state.window_start_ms = now_ms;
                    state.count = 1;
                    return Decision {
                        allowed: true,
                        remaining: u64::from(limit - 1),
                        retry_after_ms: 0,
                        reset_in_ms: window_ms,
                    };
                }

                if state.count < limit {
                    state.count += 1;
                    return Decision {
                        allowed: true,
                        remaining: u64::from(limit - state.count),
                        retry_after_ms: 0,
                        reset_in_ms: window_ms - elapsed,
                    };
                }

                // at capacity: leave state untouched
                let reset_in_ms = window_ms - elapsed;
                Decision {
                    allowed: false,
                    remaining: 0,
                    retry_after_ms: reset_in_ms,
                    reset_in_ms,
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
