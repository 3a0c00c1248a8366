use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::GatewayState;

/// Liveness probe
pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": "gatehouse",
        "version": env!("CARGO_PKG_VERSION"),
        "mcp_sessions": state.manager.session_count(),
        "uptime": state.started.elapsed().as_secs(),
        "memory": resident_memory_bytes(),
    }))
}

/// Resident set size in bytes, zero where /proc is unavailable
fn resident_memory_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| {
            let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
            Some(pages * 4096)
        })
        .unwrap_or(0)
}
