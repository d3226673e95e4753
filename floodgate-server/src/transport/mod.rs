//! Transport layer for the admission-control server
//!
//! The HTTP transport is the only protocol: it intercepts requests to the
//! protected endpoint, asks the engine for a decision, and maps it onto
//! status codes and rate-limit headers.

pub mod http;


use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::transport::http::AppState;

/// Common interface for transport implementations
///
/// A transport binds to its configured address and serves requests against
/// the shared application state until an error occurs or the server shuts
/// down.
#[async_trait]
pub trait Transport {
    async fn start(self, state: Arc<AppState>) -> Result<()>;
}
