//! Server configuration and CLI argument parsing
//!
//! All settings come from command-line arguments with environment variable
//! fallback (FLOODGATE_ prefix). Precedence:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! floodgate --port 9090 --limit 20 --window-ms 5000
//!
//! # Using environment variables
//! export FLOODGATE_LIMIT=100
//! export FLOODGATE_WINDOW_MS=60000
//! floodgate
//! ```

use anyhow::Result;
use clap::Parser;
use floodgate::RateLimitConfig;

/// Command-line arguments for the server
///
/// Rate limit parameters apply globally: every caller key shares the same
/// limit, window, and refill configuration.
#[derive(Parser, Debug)]
#[command(
    name = "floodgate",
    about = "HTTP admission-control server",
    long_about = "An HTTP admission-control server deciding per-caller request admission\nunder fixed window, sliding window, or token bucket rate limiting.\n\nEnvironment variables with FLOODGATE_ prefix are supported. CLI arguments\ntake precedence over environment variables."
)]
pub struct Args {
    // HTTP listener
    #[arg(
        long,
        value_name = "HOST",
        help = "Host to bind",
        default_value = "127.0.0.1",
        env = "FLOODGATE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Port to listen on",
        default_value_t = 8080,
        env = "FLOODGATE_PORT"
    )]
    pub port: u16,

    // Rate limit configuration
    #[arg(
        long,
        value_name = "N",
        help = "Admissions allowed per window",
        default_value_t = 100,
        env = "FLOODGATE_LIMIT"
    )]
    pub limit: u32,
    #[arg(
        long,
        value_name = "MS",
        help = "Window duration in milliseconds",
        default_value_t = 60_000,
        env = "FLOODGATE_WINDOW_MS"
    )]
    pub window_ms: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Token bucket capacity (defaults to --limit)",
        env = "FLOODGATE_BUCKET_CAPACITY"
    )]
    pub bucket_capacity: Option<u32>,
    #[arg(
        long,
        value_name = "RATE",
        help = "Token bucket refill rate per second",
        default_value_t = 1.0,
        env = "FLOODGATE_REFILL_PER_SEC"
    )]
    pub refill_per_sec: f64,

    // Store tuning
    #[arg(
        long,
        value_name = "SIZE",
        help = "Expected number of tracked keys",
        default_value_t = 100_000,
        env = "FLOODGATE_STORE_CAPACITY"
    )]
    pub store_capacity: usize,
    #[arg(
        long,
        value_name = "N",
        help = "Store shards (0 = auto from available parallelism)",
        default_value_t = 0,
        env = "FLOODGATE_STORE_SHARDS"
    )]
    pub store_shards: usize,
    #[arg(
        long,
        value_name = "SECS",
        help = "Idle-key sweep interval in seconds",
        default_value_t = 60,
        env = "FLOODGATE_SWEEP_INTERVAL"
    )]
    pub sweep_interval: u64,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "FLOODGATE_LOG_LEVEL"
    )]
    pub log_level: String,
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub store_capacity: usize,
    pub store_shards: usize,
    pub sweep_interval_secs: u64,
    pub log_level: String,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// Rate limit values are validated later, at engine construction; the
    /// server refuses to start when they are rejected there.
    pub fn from_env_and_args() -> Result<Self> {
        Ok(Self::from_args(Args::parse()))
    }

    fn from_args(args: Args) -> Self {
        Config {
            host: args.host,
            port: args.port,
            rate_limit: RateLimitConfig {
                limit: args.limit,
                window_ms: args.window_ms,
                bucket_capacity: args.bucket_capacity.unwrap_or(args.limit),
                refill_per_sec: args.refill_per_sec,
            },
            store_capacity: args.store_capacity,
            store_shards: args.store_shards,
            sweep_interval_secs: args.sweep_interval,
            log_level: args.log_level,
        }
    }
}
