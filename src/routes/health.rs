//! Health check endpoint
//!
//! /health, /healthz - liveness probe. Returns 200 whenever the process is
//! serving, along with the mode and which store backend is in use.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Operating mode
    pub mode: &'static str,
    /// `mongodb` or `memory`
    pub store: &'static str,
    pub node_id: String,
    /// Current timestamp
    pub timestamp: String,
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        mode: state.args.mode(),
        store: state.store.backend(),
        node_id: state.args.node_id.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    json_response(state, StatusCode::OK, &response)
}
