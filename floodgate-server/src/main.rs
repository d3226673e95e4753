mod config;
mod demo;
mod metrics;
mod transport;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::transport::Transport;
use crate::transport::http::{AppState, HttpTransport};
use floodgate::{Clock, RateLimiter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("floodgate={}", config.log_level).parse()?),
        )
        .init();

    // Build the engine; invalid rate limit parameters abort startup here
    let limiter = RateLimiter::builder(config.rate_limit.clone())
        .store_capacity(config.store_capacity)
        .shard_count(config.store_shards)
        .build()?;

    tracing::info!(
        limit = config.rate_limit.limit,
        window_ms = config.rate_limit.window_ms,
        bucket_capacity = config.rate_limit.bucket_capacity,
        refill_per_sec = config.rate_limit.refill_per_sec,
        "admission control configured"
    );

    let state = Arc::new(AppState {
        limiter,
        metrics: Metrics::new(),
        rate_limit: config.rate_limit.clone(),
    });

    // Background sweep of idle key state
    let sweep_state = Arc::clone(&state);
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now_ms = sweep_state.limiter.clock().now_ms();
            let evicted = sweep_state.limiter.sweep_idle(now_ms);
            let active = sweep_state.limiter.active_keys();
            sweep_state.metrics.record_sweep(evicted, active);
            if evicted > 0 {
                tracing::debug!(evicted, active, "idle key sweep");
            }
        }
    });

    tracing::info!(
        "Floodgate server starting on {}:{}",
        config.host,
        config.port
    );

    let transport = HttpTransport::new(&config.host, config.port)?;
    transport.start(state).await
}
