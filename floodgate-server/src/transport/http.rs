//! HTTP transport and admission-control middleware
//!
//! # Endpoints
//!
//! ## GET /api/check
//!
//! The rate-limited probe endpoint. Admission control runs as middleware
//! before the handler:
//!
//! - algorithm from the `X-RateLimit-Alg` header, else the `alg` query
//!   parameter; missing or unknown identifiers get `400 Bad Request`
//!   naming the valid ones, and no limiter state is touched
//! - caller key from the `X-User-Id` header, else the client address
//!
//! Every decision annotates the response with `X-RateLimit-Algorithm`,
//! `X-RateLimit-Key`, `X-RateLimit-Remaining`, `X-RateLimit-RetryAfter-Ms`,
//! and `X-RateLimit-ResetIn-Ms`. Blocked requests get `429 Too Many
//! Requests` plus a `Retry-After` header in whole seconds.
//!
//! ## GET /health
//!
//! Liveness probe, never rate limited. Returns `OK`.
//!
//! ## GET /metrics
//!
//! Prometheus text exposition of the server counters.
//!
//! ## POST /demo/run
//!
//! Runs a scripted scenario over simulated time and returns the timeline
//! report as JSON. See [`crate::demo`].

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use floodgate::{Algorithm, Decision, RateLimitConfig, RateLimiter, SystemClock};

use super::Transport;
use crate::demo;
use crate::metrics::Metrics;
use crate::types::{DemoRunRequest, DemoRunResponse};

/// Shared state behind every endpoint
pub struct AppState {
    pub limiter: RateLimiter<SystemClock>,
    pub metrics: Metrics,
    /// Engine configuration, echoed into demo runs
    pub rate_limit: RateLimitConfig,
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}").parse()?;
        Ok(Self { addr })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(self, state: Arc<AppState>) -> Result<()> {
        let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!("HTTP server listening on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/check", get(handle_check))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(handle_metrics))
        .route("/demo/run", post(handle_demo_run))
        .with_state(state)
}

async fn handle_check() -> &'static str {
    "Request Allowed"
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.export_prometheus()
}

async fn handle_demo_run(
    State(state): State<Arc<AppState>>,
    body: Option<Json<DemoRunRequest>>,
) -> Result<Json<DemoRunResponse>, (StatusCode, String)> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    match demo::run(&state.rate_limit, request) {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn admission_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let raw_algorithm = header_value(request.headers(), "x-ratelimit-alg")
        .or_else(|| query_param(request.uri().query().unwrap_or(""), "alg"));

    let algorithm = match raw_algorithm.as_deref().map(Algorithm::from_str) {
        Some(Ok(algorithm)) => algorithm,
        Some(Err(e)) => {
            state.metrics.record_invalid_algorithm();
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        None => {
            state.metrics.record_invalid_algorithm();
            return (
                StatusCode::BAD_REQUEST,
                "missing algorithm: set the X-RateLimit-Alg header or the alg query \
                 parameter to FIXED_WINDOW, SLIDING_WINDOW, or TOKEN_BUCKET"
                    .to_string(),
            )
                .into_response();
        }
    };

    let key =
        header_value(request.headers(), "x-user-id").unwrap_or_else(|| addr.ip().to_string());

    let decision = state.limiter.check(algorithm, &key);
    state.metrics.record_decision(algorithm, decision.allowed);

    tracing::debug!(
        %algorithm,
        key = %key,
        allowed = decision.allowed,
        remaining = decision.remaining,
        retry_after_ms = decision.retry_after_ms,
        "admission decision"
    );

    if !decision.allowed {
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
        annotate(response.headers_mut(), algorithm, &key, &decision);
        insert_header(
            response.headers_mut(),
            "retry-after",
            &retry_after_secs(decision.retry_after_ms).to_string(),
        );
        return response;
    }

    let mut response = next.run(request).await;
    annotate(response.headers_mut(), algorithm, &key, &decision);
    response
}

fn annotate(headers: &mut HeaderMap, algorithm: Algorithm, key: &str, decision: &Decision) {
    insert_header(headers, "x-ratelimit-algorithm", algorithm.as_str());
    insert_header(headers, "x-ratelimit-key", key);
    insert_header(headers, "x-ratelimit-remaining", &decision.remaining.to_string());
    insert_header(
        headers,
        "x-ratelimit-retryafter-ms",
        &decision.retry_after_ms.to_string(),
    );
    insert_header(
        headers,
        "x-ratelimit-resetin-ms",
        &decision.reset_in_ms.to_string(),
    );
}

// keys come from arbitrary client input and may not be valid header values;
// such a header is skipped rather than failing the response
fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// Whole-second retry hint for the `Retry-After` header, at least 1
pub(crate) fn retry_after_secs(retry_after_ms: u64) -> u64 {
    retry_after_ms.div_ceil(1000).max(1)
}
