//! Wire types shared between the HTTP transport and the demo runner

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /demo/run`
///
/// All fields are optional; omitted ones fall back to a fixed-window
/// boundary-burst run for `demo_user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoRunRequest {
    /// Scenario name (see [`crate::demo::Scenario`])
    pub scenario: Option<String>,
    /// Algorithm identifier (FIXED_WINDOW, SLIDING_WINDOW, TOKEN_BUCKET)
    pub algorithm: Option<String>,
    /// Caller key used for every request in the run
    pub user_id: Option<String>,
}

/// One simulated request in a demo timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoEvent {
    /// 1-based position in the run
    pub index: usize,
    /// Simulated time offset since the run started (ms)
    pub t_ms: u64,
    /// 200 when admitted, 429 when rate limited
    pub status: u16,
    /// Quota or tokens left after this request
    pub remaining: u64,
    /// Suggested wait until the next request may succeed (ms)
    pub retry_after_ms: u64,
    /// Time until the next meaningful reset/refill point (ms)
    pub reset_in_ms: u64,
}

/// Full report returned by a demo run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoRunResponse {
    pub scenario: String,
    pub algorithm: String,
    pub user_id: String,
    /// Configuration echo plus reading hints for the timeline
    pub notes: Value,
    pub allowed_count: usize,
    pub blocked_count: usize,
    pub timeline: Vec<DemoEvent>,
}
