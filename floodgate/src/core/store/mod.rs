//! Concurrent per-key state storage
//!
//! [`ShardedStore`] partitions keys across multiple internal maps, each
//! guarded by its own lock. Decisions for the same key serialize on that
//! key's shard; keys in different shards never contend. There is no global
//! lock.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

#[cfg(test)]
mod tests;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;
const DEFAULT_IDLE_AFTER_MS: u64 = 180_000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Sharded map from caller key to algorithm-specific state
///
/// Each entry tracks the state plus the key's most recent access time, so
/// long-idle keys can be reclaimed. Eviction runs under the same per-shard
/// lock as state access, so a sweep can never race a concurrent lazy
/// re-creation of the same key: a caller either sees its entry before the
/// sweep removes it, or materializes a fresh one afterwards.
pub struct ShardedStore<S> {
    shards: Box<[Shard<S>]>,
    // shard count is a power of two
    mask: usize,
    idle_after_ms: u64,
    sweep_interval_ms: u64,
}

struct Shard<S> {
    slots: Mutex<Slots<S>>,
}

struct Slots<S> {
    entries: HashMap<String, Entry<S>>,
    next_sweep_ms: u64,
}

struct Entry<S> {
    state: S,
    last_seen_ms: u64,
}

/// Builder for configuring a [`ShardedStore`]
///
/// # Example
///
/// ```
/// use floodgate::{ShardedStore, ShardedStoreBuilder};
///
/// let store: ShardedStore<u64> = ShardedStoreBuilder::new()
///     .capacity(100_000)
///     .shard_count(32)
///     .idle_after_ms(300_000)
///     .build();
/// assert!(store.is_empty());
/// ```
pub struct ShardedStoreBuilder {
    capacity: usize,
    shard_count: usize,
    idle_after_ms: u64,
    sweep_interval_ms: u64,
}

impl<S> ShardedStore<S> {
    /// Create a store with default capacity, sharding, and retention
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring a store
    pub fn builder() -> ShardedStoreBuilder {
        ShardedStoreBuilder::new()
    }

    /// Run `apply` against `key`'s state as one critical section
    ///
    /// Materializes the state via `init` if the key has none, stamps the
    /// key's last access time, and passes the state to `apply` while the
    /// shard lock is held. Concurrent callers for the same key serialize
    /// here; no caller can observe a partial update.
    pub fn with_state<T>(
        &self,
        key: &str,
        now_ms: u64,
        init: impl FnOnce() -> S,
        apply: impl FnOnce(&mut S) -> T,
    ) -> T {
        let shard = self.shard_for(key);
        let mut slots = match shard.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if now_ms >= slots.next_sweep_ms {
            let idle_after = self.idle_after_ms;
            slots
                .entries
                .retain(|_, e| now_ms.saturating_sub(e.last_seen_ms) <= idle_after);
            slots.next_sweep_ms = now_ms + self.sweep_interval_ms;
        }

        if let Some(entry) = slots.entries.get_mut(key) {
            // never stamp backwards under a clock regression
            entry.last_seen_ms = entry.last_seen_ms.max(now_ms);
            return apply(&mut entry.state);
        }

        let mut entry = Entry {
            state: init(),
            last_seen_ms: now_ms,
        };
        let out = apply(&mut entry.state);
        slots.entries.insert(key.to_string(), entry);
        out
    }

    /// Remove entries whose most recent access predates the idle threshold
    ///
    /// Returns the number of evicted keys. Safe to call concurrently with
    /// decisions; each shard is swept under its own lock.
    pub fn sweep_idle(&self, now_ms: u64) -> usize {
        let mut evicted = 0;
        for shard in self.shards.iter() {
            let mut slots = match shard.slots.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let before = slots.entries.len();
            let idle_after = self.idle_after_ms;
            slots
                .entries
                .retain(|_, e| now_ms.saturating_sub(e.last_seen_ms) <= idle_after);
            evicted += before - slots.entries.len();
            slots.next_sweep_ms = now_ms + self.sweep_interval_ms;
        }
        evicted
    }

    /// Number of keys currently holding state
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| match shard.slots.lock() {
                Ok(guard) => guard.entries.len(),
                Err(poisoned) => poisoned.into_inner().entries.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_for(&self, key: &str) -> &Shard<S> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }
}

impl<S> Default for ShardedStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ShardedStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardedStoreBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        ShardedStoreBuilder {
            capacity: DEFAULT_CAPACITY,
            shard_count: 0,
            idle_after_ms: DEFAULT_IDLE_AFTER_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }

    /// Set the expected number of unique keys
    ///
    /// The store allocates 30% more space to reduce hash collisions.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of shards (rounded up to a power of two)
    ///
    /// Zero selects the default of 4x the available parallelism.
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Set how long a key may stay idle before its state is reclaimed
    pub fn idle_after_ms(mut self, idle_after_ms: u64) -> Self {
        self.idle_after_ms = idle_after_ms;
        self
    }

    /// Set the interval between opportunistic per-shard sweeps
    pub fn sweep_interval_ms(mut self, sweep_interval_ms: u64) -> Self {
        self.sweep_interval_ms = sweep_interval_ms;
        self
    }

    /// Build the store with the configured settings
    pub fn build<S>(self) -> ShardedStore<S> {
        let requested = if self.shard_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get() * 4)
                .unwrap_or(16)
        } else {
            self.shard_count
        };
        let shard_count = requested.next_power_of_two();
        let per_shard =
            (self.capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize / shard_count + 1;

        let shards = (0..shard_count)
            .map(|_| Shard {
                slots: Mutex::new(Slots {
                    entries: HashMap::with_capacity(per_shard),
                    next_sweep_ms: 0,
                }),
            })
            .collect();

        ShardedStore {
            shards,
            mask: shard_count - 1,
            idle_after_ms: self.idle_after_ms,
            sweep_interval_ms: self.sweep_interval_ms,
        }
    }
}
