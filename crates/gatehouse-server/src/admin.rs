//! Management and legacy endpoints: plain JSON, HTTP status
//! semantics, no SSE framing

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use gatehouse_core::HttpError as _;

use crate::mcp::execute_tool;
use crate::state::GatewayState;

/// Legacy direct proxy body
#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    pub server: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// `POST /mcp/proxy` — pre-protocol direct tool invocation
///
/// Kept for clients that predate the JSON-RPC endpoint: auth errors
/// are HTTP 401/403 and the result is a bare JSON body.
pub async fn legacy_proxy(
    State(state): State<Arc<GatewayState>>,
    headers: http::HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(request) = serde_json::from_slice::<ProxyRequest>(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "Malformed proxy request");
    };

    let ctx = match state.authenticate(&headers) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(e.status_code(), e.error_type(), &e.client_message()),
    };

    if !ctx.can_access_server(&request.server) {
        return error_response(
            StatusCode::FORBIDDEN,
            "access_denied",
            &format!("API key not authorized for server: {}", request.server),
        );
    }

    let name = format!("{}:{}", request.server, request.tool);
    let started = Instant::now();
    match execute_tool(&state, &ctx, &name, request.arguments).await {
        Ok((_, result)) => {
            tracing::debug!(
                server = %request.server,
                tool = %request.tool,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "legacy proxy call completed"
            );
            Json(result).into_response()
        }
        Err(failure) => {
            let status = match failure.code {
                gatehouse_core::METHOD_NOT_FOUND => StatusCode::NOT_FOUND,
                gatehouse_core::AUTH_REQUIRED => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, "tool_call_failed", &failure.message)
        }
    }
}

/// `GET /mcp/tools` — annotated catalog for operators
///
/// Unlike the protocol listing this keeps the per-server grouping and
/// internal fields. A valid key narrows it to accessible servers.
pub async fn list_tools(
    State(state): State<Arc<GatewayState>>,
    headers: http::HeaderMap,
) -> Json<Value> {
    state.manager.refresh_all_tools().await;

    let access = state.authenticate(&headers).ok();
    let servers: Vec<Value> = state
        .registry
        .summaries()
        .into_iter()
        .filter(|s| access.as_ref().is_none_or(|ctx| ctx.can_access_server(&s.slug)))
        .map(|s| {
            json!({
                "slug": s.slug,
                "name": s.name,
                "status": s.status,
                "tools": state.registry.tools_for(&s.slug),
            })
        })
        .collect();

    let count = servers.len();
    Json(json!({"servers": servers, "count": count}))
}

/// `GET /mcp/sessions` — live upstream session table
pub async fn list_sessions(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let sessions = state.manager.sessions();
    Json(json!({"count": sessions.len(), "sessions": sessions}))
}

fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = json!({"error": {"type": error_type, "message": message}});
    (status, Json(body)).into_response()
}
