use super::{Algorithm, LimitError, ManualClock, RateLimitConfig, RateLimiter};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

fn demo_config() -> RateLimitConfig {
    RateLimitConfig {
        limit: 5,
        window_ms: 10_000,
        bucket_capacity: 5,
        refill_per_sec: 1.0,
    }
}

fn engine() -> RateLimiter<ManualClock> {
    RateLimiter::with_clock(demo_config(), ManualClock::new(0)).unwrap()
}

#[test]
fn fixed_window_burst_then_block() {
    let limiter = engine();

    for expected_remaining in [4, 3, 2, 1, 0] {
        let d = limiter.check_at(Algorithm::FixedWindow, "user", 0);
        assert!(d.allowed);
        assert_eq!(d.remaining, expected_remaining);
        assert_eq!(d.retry_after_ms, 0);
    }

    let d = limiter.check_at(Algorithm::FixedWindow, "user", 0);
    assert!(!d.allowed);
    assert_eq!(d.remaining, 0);
    assert_eq!(d.retry_after_ms, 10_000);
    assert_eq!(d.reset_in_ms, 10_000);
}

#[test]
fn fixed_window_blocked_leaves_state_untouched() {
    let limiter = engine();

    for _ in 0..5 {
        assert!(limiter.check_at(Algorithm::FixedWindow, "user", 0).allowed);
    }

    // repeated blocked calls at a later instant all report the same wait
    for _ in 0..3 {
        let d = limiter.check_at(Algorithm::FixedWindow, "user", 4_000);
        assert!(!d.allowed);
        assert_eq!(d.retry_after_ms, 6_000);
    }
}

#[test]
fn fixed_window_resets_after_boundary() {
    let limiter = engine();

    for _ in 0..6 {
        limiter.check_at(Algorithm::FixedWindow, "user", 0);
    }

    let d = limiter.check_at(Algorithm::FixedWindow, "user", 10_001);
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
    assert_eq!(d.reset_in_ms, 10_000);
}

#[test]
fn fixed_window_boundary_double_dip() {
    let limiter = engine();

    // prime the window, then burst right before the boundary
    assert!(limiter.check_at(Algorithm::FixedWindow, "user", 0).allowed);
    for _ in 0..4 {
        assert!(limiter.check_at(Algorithm::FixedWindow, "user", 9_900).allowed);
    }
    assert!(!limiter.check_at(Algorithm::FixedWindow, "user", 9_900).allowed);

    // a fresh burst of the full limit lands just past the boundary
    for i in 0..5 {
        let d = limiter.check_at(Algorithm::FixedWindow, "user", 10_100);
        assert!(d.allowed, "post-boundary request {} should be admitted", i + 1);
    }
    assert!(!limiter.check_at(Algorithm::FixedWindow, "user", 10_100).allowed);
}

#[test]
fn fixed_window_exact_boundary_is_same_window() {
    let limiter = engine();

    for _ in 0..5 {
        limiter.check_at(Algorithm::FixedWindow, "user", 0);
    }

    // reset requires now - start to exceed the window, not merely reach it
    assert!(!limiter.check_at(Algorithm::FixedWindow, "user", 10_000).allowed);
    assert!(limiter.check_at(Algorithm::FixedWindow, "user", 10_001).allowed);
}

#[test]
fn sliding_window_burst_then_block() {
    let limiter = engine();

    for expected_remaining in [4, 3, 2, 1, 0] {
        let d = limiter.check_at(Algorithm::SlidingWindow, "user", 0);
        assert!(d.allowed);
        assert_eq!(d.remaining, expected_remaining);
        assert_eq!(d.reset_in_ms, 10_000);
    }

    let d = limiter.check_at(Algorithm::SlidingWindow, "user", 0);
    assert!(!d.allowed);
    assert_eq!(d.remaining, 0);
    assert_eq!(d.retry_after_ms, 10_000);

    // the oldest of the five has aged out by now
    let d = limiter.check_at(Algorithm::SlidingWindow, "user", 10_001);
    assert!(d.allowed);
    assert_eq!(d.remaining, 0);
}

#[test]
fn sliding_window_blocked_wait_tracks_oldest_entry() {
    let limiter = engine();

    for _ in 0..5 {
        limiter.check_at(Algorithm::SlidingWindow, "user", 0);
    }

    // 4s into the window, the oldest entry expires 6s from now
    let d = limiter.check_at(Algorithm::SlidingWindow, "user", 4_000);
    assert!(!d.allowed);
    assert_eq!(d.retry_after_ms, 6_000);
    assert_eq!(d.reset_in_ms, 6_000);
}

#[test]
fn sliding_window_recovers_gradually() {
    let limiter = engine();

    // admissions staggered 100ms apart
    for i in 0..5u64 {
        assert!(
            limiter
                .check_at(Algorithm::SlidingWindow, "user", i * 100)
                .allowed
        );
    }
    assert!(!limiter.check_at(Algorithm::SlidingWindow, "user", 500).allowed);

    // only the t=0 entry has aged out: exactly one slot back
    assert!(
        limiter
            .check_at(Algorithm::SlidingWindow, "user", 10_050)
            .allowed
    );
    assert!(
        !limiter
            .check_at(Algorithm::SlidingWindow, "user", 10_050)
            .allowed
    );

    // the t=100 entry frees the next slot, and no more
    assert!(
        limiter
            .check_at(Algorithm::SlidingWindow, "user", 10_150)
            .allowed
    );
    assert!(
        !limiter
            .check_at(Algorithm::SlidingWindow, "user", 10_150)
            .allowed
    );
}

#[test]
fn sliding_window_empty_window_admits() {
    let limiter = engine();
    // long after any activity would have aged out
    let d = limiter.check_at(Algorithm::SlidingWindow, "user", 1_000_000);
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
}

#[test]
fn token_bucket_burst_then_refill() {
    let limiter = engine();

    for expected_remaining in [4, 3, 2, 1, 0] {
        let d = limiter.check_at(Algorithm::TokenBucket, "user", 0);
        assert!(d.allowed);
        assert_eq!(d.remaining, expected_remaining);
    }

    let d = limiter.check_at(Algorithm::TokenBucket, "user", 0);
    assert!(!d.allowed);
    assert_eq!(d.remaining, 0);
    assert_eq!(d.retry_after_ms, 1_000);
    assert_eq!(d.reset_in_ms, 1_000);

    // one second later exactly one token has accrued
    let d = limiter.check_at(Algorithm::TokenBucket, "user", 1_000);
    assert!(d.allowed);
    assert_eq!(d.remaining, 0);
}

#[test]
fn token_bucket_refill_is_time_based_not_call_based() {
    let limiter = engine();

    for _ in 0..5 {
        limiter.check_at(Algorithm::TokenBucket, "user", 0);
    }

    // hammering the empty bucket grants nothing
    for _ in 0..10 {
        assert!(!limiter.check_at(Algorithm::TokenBucket, "user", 10).allowed);
    }

    // 3.5s idle accrues 3.5 tokens regardless of the calls in between
    let d = limiter.check_at(Algorithm::TokenBucket, "user", 3_510);
    assert!(d.allowed);
    assert_eq!(d.remaining, 2);
}

#[test]
fn token_bucket_never_exceeds_capacity() {
    let limiter = engine();

    assert!(limiter.check_at(Algorithm::TokenBucket, "user", 0).allowed);

    // a week of idle time still caps the bucket at capacity
    let d = limiter.check_at(Algorithm::TokenBucket, "user", 7 * 24 * 3_600_000);
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
}

#[test]
fn token_bucket_fractional_refill() {
    let config = RateLimitConfig {
        limit: 5,
        window_ms: 10_000,
        bucket_capacity: 1,
        refill_per_sec: 2.0,
    };
    let limiter = RateLimiter::with_clock(config, ManualClock::new(0)).unwrap();

    assert!(limiter.check_at(Algorithm::TokenBucket, "user", 0).allowed);

    // 250ms at 2 tokens/sec leaves 0.5 tokens: blocked, 250ms to go
    let d = limiter.check_at(Algorithm::TokenBucket, "user", 250);
    assert!(!d.allowed);
    assert_eq!(d.retry_after_ms, 250);

    assert!(limiter.check_at(Algorithm::TokenBucket, "user", 500).allowed);
}

#[test]
fn keys_are_independent() {
    let limiter = engine();

    for _ in 0..5 {
        assert!(limiter.check_at(Algorithm::FixedWindow, "alice", 0).allowed);
    }
    assert!(!limiter.check_at(Algorithm::FixedWindow, "alice", 0).allowed);

    // alice's exhaustion never touches bob
    let d = limiter.check_at(Algorithm::FixedWindow, "bob", 0);
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
}

#[test]
fn algorithms_keep_separate_state_per_key() {
    let limiter = engine();

    for _ in 0..5 {
        limiter.check_at(Algorithm::FixedWindow, "user", 0);
    }
    assert!(!limiter.check_at(Algorithm::FixedWindow, "user", 0).allowed);

    // the same key is untouched under the other algorithms
    assert!(limiter.check_at(Algorithm::SlidingWindow, "user", 0).allowed);
    assert!(limiter.check_at(Algorithm::TokenBucket, "user", 0).allowed);
}

#[test]
fn clock_regression_never_yields_negative_durations() {
    let limiter = engine();

    assert!(limiter.check_at(Algorithm::FixedWindow, "user", 5_000).allowed);
    let d = limiter.check_at(Algorithm::FixedWindow, "user", 1_000);
    assert!(d.allowed);
    assert!(d.reset_in_ms <= 10_000);

    assert!(limiter.check_at(Algorithm::TokenBucket, "user", 5_000).allowed);
    let d = limiter.check_at(Algorithm::TokenBucket, "user", 1_000);
    assert!(d.allowed);

    assert!(
        limiter
            .check_at(Algorithm::SlidingWindow, "user", 5_000)
            .allowed
    );
    let d = limiter.check_at(Algorithm::SlidingWindow, "user", 1_000);
    assert!(d.allowed);
}

#[test]
fn engine_reads_injected_clock() {
    let limiter = engine();

    for _ in 0..5 {
        assert!(limiter.check(Algorithm::FixedWindow, "user").allowed);
    }
    assert!(!limiter.check(Algorithm::FixedWindow, "user").allowed);

    limiter.clock().advance(10_001);
    assert!(limiter.check(Algorithm::FixedWindow, "user").allowed);
}

#[test]
fn sweep_idle_reclaims_and_recreates() {
    let limiter = engine();

    limiter.check_at(Algorithm::FixedWindow, "user", 0);
    limiter.check_at(Algorithm::SlidingWindow, "user", 0);
    limiter.check_at(Algorithm::TokenBucket, "user", 0);
    assert_eq!(limiter.active_keys(), 3);

    // nothing is idle yet
    assert_eq!(limiter.sweep_idle(1_000), 0);
    assert_eq!(limiter.active_keys(), 3);

    // three window durations later everything is reclaimable
    let evicted = limiter.sweep_idle(100_000);
    assert_eq!(evicted, 3);
    assert_eq!(limiter.active_keys(), 0);

    // a swept key lazily re-materializes with a fresh window
    let d = limiter.check_at(Algorithm::FixedWindow, "user", 100_000);
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
}

#[test]
fn concurrent_same_key_admits_exactly_the_limit() {
    let limiter = Arc::new(engine());
    let threads = 20;

    let admitted: usize = thread::scope(|s| {
        (0..threads)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                s.spawn(move || {
                    usize::from(limiter.check_at(Algorithm::FixedWindow, "hot", 0).allowed)
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum()
    });

    assert_eq!(admitted, 5);
}

#[test]
fn concurrent_distinct_keys_all_admitted() {
    let limiter = Arc::new(engine());

    thread::scope(|s| {
        for i in 0..16 {
            let limiter = Arc::clone(&limiter);
            s.spawn(move || {
                let key = format!("user:{i}");
                for _ in 0..5 {
                    assert!(limiter.check_at(Algorithm::SlidingWindow, &key, 0).allowed);
                }
                assert!(!limiter.check_at(Algorithm::SlidingWindow, &key, 0).allowed);
            });
        }
    });
}

#[test]
fn algorithm_parsing() {
    assert_eq!(
        Algorithm::from_str("FIXED_WINDOW").unwrap(),
        Algorithm::FixedWindow
    );
    assert_eq!(
        Algorithm::from_str("sliding_window").unwrap(),
        Algorithm::SlidingWindow
    );
    assert_eq!(
        Algorithm::from_str("Token_Bucket").unwrap(),
        Algorithm::TokenBucket
    );

    let err = Algorithm::from_str("LEAKY_BUCKET").unwrap_err();
    assert_eq!(err, LimitError::InvalidAlgorithm("LEAKY_BUCKET".into()));
    // the rejection names every valid identifier
    let msg = err.to_string();
    for id in Algorithm::IDENTIFIERS {
        assert!(msg.contains(id), "{msg:?} should mention {id}");
    }
}

#[test]
fn algorithm_display_round_trips() {
    for id in Algorithm::IDENTIFIERS {
        let alg = Algorithm::from_str(id).unwrap();
        assert_eq!(alg.to_string(), id);
    }
}

#[test]
fn invalid_configuration_fails_construction() {
    let cases = [
        RateLimitConfig {
            limit: 0,
            ..demo_config()
        },
        RateLimitConfig {
            window_ms: 0,
            ..demo_config()
        },
        RateLimitConfig {
            bucket_capacity: 0,
            ..demo_config()
        },
        RateLimitConfig {
            refill_per_sec: 0.0,
            ..demo_config()
        },
        RateLimitConfig {
            refill_per_sec: -1.0,
            ..demo_config()
        },
        RateLimitConfig {
            refill_per_sec: f64::NAN,
            ..demo_config()
        },
    ];

    for config in cases {
        assert!(matches!(
            RateLimiter::new(config),
            Err(LimitError::InvalidConfig(_))
        ));
    }
}
