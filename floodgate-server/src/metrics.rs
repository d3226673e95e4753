//! Simple metrics collection for observability
//!
//! Lightweight atomic counters with zero allocation on the hot path,
//! exported in Prometheus text format at `GET /metrics`.

use floodgate::Algorithm;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Core metrics collected by the server
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Total admission decisions
    pub decisions_total: AtomicU64,

    /// Decisions by algorithm
    pub fixed_window_decisions: AtomicU64,
    pub sliding_window_decisions: AtomicU64,
    pub token_bucket_decisions: AtomicU64,

    /// Decision outcomes
    pub requests_allowed: AtomicU64,
    pub requests_denied: AtomicU64,

    /// Requests rejected before reaching any limiter
    pub invalid_algorithm: AtomicU64,

    /// Store metrics
    pub active_keys: AtomicUsize,
    pub keys_evicted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            decisions_total: AtomicU64::new(0),
            fixed_window_decisions: AtomicU64::new(0),
            sliding_window_decisions: AtomicU64::new(0),
            token_bucket_decisions: AtomicU64::new(0),
            requests_allowed: AtomicU64::new(0),
            requests_denied: AtomicU64::new(0),
            invalid_algorithm: AtomicU64::new(0),
            active_keys: AtomicUsize::new(0),
            keys_evicted: AtomicU64::new(0),
        }
    }

    /// Record a decision and its outcome
    pub fn record_decision(&self, algorithm: Algorithm, allowed: bool) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);

        match algorithm {
            Algorithm::FixedWindow => self.fixed_window_decisions.fetch_add(1, Ordering::Relaxed),
            Algorithm::SlidingWindow => {
                self.sliding_window_decisions.fetch_add(1, Ordering::Relaxed)
            }
            Algorithm::TokenBucket => self.token_bucket_decisions.fetch_add(1, Ordering::Relaxed),
        };

        if allowed {
            self.requests_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request rejected for an unknown algorithm identifier
    pub fn record_invalid_algorithm(&self) {
        self.invalid_algorithm.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of an idle-key sweep
    pub fn record_sweep(&self, evicted: usize, active: usize) {
        self.keys_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        self.active_keys.store(active, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(1200);

        output.push_str("# HELP floodgate_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE floodgate_uptime_seconds gauge\n");
        output.push_str(&format!(
            "floodgate_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        output.push_str("# HELP floodgate_decisions_total Total admission decisions\n");
        output.push_str("# TYPE floodgate_decisions_total counter\n");
        output.push_str(&format!(
            "floodgate_decisions_total {}\n\n",
            self.decisions_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP floodgate_decisions_by_algorithm Decisions by algorithm\n");
        output.push_str("# TYPE floodgate_decisions_by_algorithm counter\n");
        output.push_str(&format!(
            "floodgate_decisions_by_algorithm{{algorithm=\"fixed_window\"}} {}\n",
            self.fixed_window_decisions.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "floodgate_decisions_by_algorithm{{algorithm=\"sliding_window\"}} {}\n",
            self.sliding_window_decisions.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "floodgate_decisions_by_algorithm{{algorithm=\"token_bucket\"}} {}\n\n",
            self.token_bucket_decisions.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP floodgate_requests_allowed Total requests admitted\n");
        output.push_str("# TYPE floodgate_requests_allowed counter\n");
        output.push_str(&format!(
            "floodgate_requests_allowed {}\n\n",
            self.requests_allowed.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP floodgate_requests_denied Total requests rate limited\n");
        output.push_str("# TYPE floodgate_requests_denied counter\n");
        output.push_str(&format!(
            "floodgate_requests_denied {}\n\n",
            self.requests_denied.load(Ordering::Relaxed)
        ));

        output.push_str(
            "# HELP floodgate_invalid_algorithm Requests rejected for an unknown algorithm\n",
        );
        output.push_str("# TYPE floodgate_invalid_algorithm counter\n");
        output.push_str(&format!(
            "floodgate_invalid_algorithm {}\n\n",
            self.invalid_algorithm.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP floodgate_active_keys Keys currently holding limiter state\n");
        output.push_str("# TYPE floodgate_active_keys gauge\n");
        output.push_str(&format!(
            "floodgate_active_keys {}\n\n",
            self.active_keys.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP floodgate_keys_evicted Total idle keys evicted\n");
        output.push_str("# TYPE floodgate_keys_evicted counter\n");
        output.push_str(&format!(
            "floodgate_keys_evicted {}\n",
            self.keys_evicted.load(Ordering::Relaxed)
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
