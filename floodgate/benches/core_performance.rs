use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use floodgate::{Algorithm, RateLimitConfig, RateLimiter};
use std::hint::black_box;
use std::time::Duration;

fn bench_config() -> RateLimitConfig {
    RateLimitConfig {
        limit: 1_000_000,
        window_ms: 60_000,
        bucket_capacity: 1_000_000,
        refill_per_sec: 10_000.0,
    }
}

fn benchmark_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_decision");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    for algorithm in [
        Algorithm::FixedWindow,
        Algorithm::SlidingWindow,
        Algorithm::TokenBucket,
    ] {
        group.bench_function(format!("single_key_{algorithm}"), |b| {
            let limiter = RateLimiter::new(bench_config()).unwrap();
            let mut now = 0u64;

            b.iter(|| {
                now += 1;
                black_box(limiter.check_at(
                    black_box(algorithm),
                    black_box("bench_key"),
                    black_box(now),
                ))
            });
        });

        group.bench_function(format!("rotating_keys_100_{algorithm}"), |b| {
            let limiter = RateLimiter::new(bench_config()).unwrap();
            let mut counter = 0u64;

            b.iter(|| {
                let key = format!("key_{}", counter % 100);
                counter += 1;
                black_box(limiter.check_at(black_box(algorithm), black_box(&key), counter))
            });
        });
    }

    // worst case: an exhausted key that stays blocked
    group.bench_function("single_key_denied", |b| {
        let config = RateLimitConfig {
            limit: 5,
            window_ms: 60_000,
            bucket_capacity: 5,
            refill_per_sec: 1.0,
        };
        let limiter = RateLimiter::new(config).unwrap();
        for _ in 0..10 {
            limiter.check_at(Algorithm::FixedWindow, "exhausted_key", 0);
        }

        b.iter(|| {
            black_box(limiter.check_at(
                black_box(Algorithm::FixedWindow),
                black_box("exhausted_key"),
                black_box(1),
            ))
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_algorithms);
criterion_main!(benches);
