//! Scenario runner illustrating each algorithm's signature behavior
//!
//! Each scenario drives a scripted request timeline against a fresh engine
//! built from the server's configuration. Time is simulated through a
//! [`ManualClock`], so runs are deterministic and return immediately
//! instead of sleeping through real window durations.

use std::str::FromStr;

use anyhow::{Result, anyhow};
use floodgate::{Algorithm, Clock, ManualClock, RateLimitConfig, RateLimiter};
use serde_json::json;

use crate::types::{DemoEvent, DemoRunRequest, DemoRunResponse};

/// Scripted demo scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Two full bursts admitted back-to-back across a window boundary
    FixedWindowBoundaryBurst,
    /// Gradual recovery after a burst, no hard reset
    SlidingWindowSmooth,
    /// Burst up to capacity, then steady one-per-second recovery
    TokenBucketBurstRefill,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::FixedWindowBoundaryBurst => "FIXED_WINDOW_BOUNDARY_BURST",
            Scenario::SlidingWindowSmooth => "SLIDING_WINDOW_SMOOTH",
            Scenario::TokenBucketBurstRefill => "TOKEN_BUCKET_BURST_REFILL",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Scenario::FixedWindowBoundaryBurst => {
                "Fixed window: boundary burst (double dip) demonstration"
            }
            Scenario::SlidingWindowSmooth => "Sliding window: smoother limiting, no hard reset",
            Scenario::TokenBucketBurstRefill => "Token bucket: burst allowance plus steady refill",
        }
    }

    fn trigger(&self) -> &'static str {
        match self {
            Scenario::FixedWindowBoundaryBurst => {
                "prime -> wait(window - 200ms) -> burst -> wait(250ms) -> burst"
            }
            Scenario::SlidingWindowSmooth => {
                "burst(limit) -> extra(5) -> wait(window / 2) -> spaced requests"
            }
            Scenario::TokenBucketBurstRefill => "burst(capacity + 3) -> one request per second x5",
        }
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED_WINDOW_BOUNDARY_BURST" => Ok(Scenario::FixedWindowBoundaryBurst),
            "SLIDING_WINDOW_SMOOTH" => Ok(Scenario::SlidingWindowSmooth),
            "TOKEN_BUCKET_BURST_REFILL" => Ok(Scenario::TokenBucketBurstRefill),
            _ => Err(anyhow!(
                "Unknown scenario: {}. Use FIXED_WINDOW_BOUNDARY_BURST | SLIDING_WINDOW_SMOOTH | TOKEN_BUCKET_BURST_REFILL",
                s
            )),
        }
    }
}

/// Execute a demo run and build the timeline report
pub fn run(config: &RateLimitConfig, request: DemoRunRequest) -> Result<DemoRunResponse> {
    let scenario = match request.scenario.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Scenario::from_str(raw)?,
        None => Scenario::FixedWindowBoundaryBurst,
    };
    let algorithm = match request.algorithm.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Algorithm::from_str(raw)?,
        None => Algorithm::FixedWindow,
    };
    let user_id = request
        .user_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "demo_user".to_string());

    let mut driver = Driver {
        limiter: RateLimiter::with_clock(config.clone(), ManualClock::new(0))?,
        algorithm,
        user_id,
        timeline: Vec::new(),
    };

    match scenario {
        Scenario::FixedWindowBoundaryBurst => {
            driver.call();
            driver.wait(config.window_ms.saturating_sub(200));
            for _ in 0..config.limit.saturating_sub(1) {
                driver.call();
            }
            driver.wait(250);
            for _ in 0..config.limit {
                driver.call();
            }
        }
        Scenario::SlidingWindowSmooth => {
            for _ in 0..config.limit {
                driver.call();
            }
            for _ in 0..5 {
                driver.call();
            }
            driver.wait((config.window_ms / 2).max(200));
            for _ in 0..5 {
                driver.call();
                driver.wait(150);
            }
        }
        Scenario::TokenBucketBurstRefill => {
            for _ in 0..config.bucket_capacity + 3 {
                driver.call();
            }
            for _ in 0..5 {
                driver.wait(1_000);
                driver.call();
            }
        }
    }

    let allowed_count = driver.timeline.iter().filter(|e| e.status == 200).count();
    let blocked_count = driver.timeline.iter().filter(|e| e.status == 429).count();

    let notes = json!({
        "config": {
            "limit": config.limit,
            "window_ms": config.window_ms,
            "bucket_capacity": config.bucket_capacity,
            "refill_per_sec": config.refill_per_sec,
        },
        "title": scenario.title(),
        "trigger": scenario.trigger(),
        "how_to_read": [
            "Each timeline item is one simulated request.",
            "status=200 means admitted; status=429 means rate limited.",
            "remaining is the quota/tokens left after that request (0 means at the limit).",
            "retry_after_ms is roughly how long to wait until the next request may succeed.",
            "t_ms is simulated time since the run started; no real waiting happens.",
        ],
    });

    Ok(DemoRunResponse {
        scenario: scenario.as_str().to_string(),
        algorithm: algorithm.to_string(),
        user_id: driver.user_id,
        notes,
        allowed_count,
        blocked_count,
        timeline: driver.timeline,
    })
}

struct Driver {
    limiter: RateLimiter<ManualClock>,
    algorithm: Algorithm,
    user_id: String,
    timeline: Vec<DemoEvent>,
}

impl Driver {
    fn call(&mut self) {
        let t_ms = self.limiter.clock().now_ms();
        let decision = self.limiter.check(self.algorithm, &self.user_id);
        self.timeline.push(DemoEvent {
            index: self.timeline.len() + 1,
            t_ms,
            status: if decision.allowed { 200 } else { 429 },
            remaining: decision.remaining,
            retry_after_ms: decision.retry_after_ms,
            reset_in_ms: decision.reset_in_ms,
        });
    }

    fn wait(&mut self, delta_ms: u64) {
        self.limiter.clock().advance(delta_ms);
    }
}
