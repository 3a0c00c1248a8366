//! Operator-facing rule dry-run endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use gatehouse_rules::{Decision, RuleTarget};

use crate::state::GatewayState;

/// `POST /security/check` body
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub target: RuleTarget,
    pub subject: String,
    #[serde(default)]
    pub actor_level: Option<i64>,
    #[serde(default)]
    pub is_write: bool,
}

/// Evaluate a subject against the loaded rules without acting on it
///
/// Returns the full decision including every matched rule, so an
/// operator can see why a rule tables behaves the way it does before
/// an agent trips over it.
pub async fn check(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CheckRequest>,
) -> Json<Decision> {
    let decision = state.engine.evaluate(
        request.target,
        &request.subject,
        request.actor_level,
        request.is_write,
    );
    Json(decision)
}
