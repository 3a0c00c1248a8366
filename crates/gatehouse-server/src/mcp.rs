//! The MCP protocol endpoint
//!
//! One route carries the whole JSON-RPC state machine; GET on the
//! same path opens the keep-alive SSE stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, StreamExt as _};
use http::HeaderMap;
use jiff::Timestamp;
use serde_json::{Value, json};

use gatehouse_auth::{KeyContext, UsageRecord};
use gatehouse_config::McpConfig;
use gatehouse_core::{AUTH_REQUIRED, INVALID_REQUEST, METHOD_NOT_FOUND, PROTOCOL_VERSION, RpcId};
use gatehouse_core::HttpError as _;

use crate::framing::{self, SESSION_HEADER};
use crate::protocol::McpRequest;
use crate::state::GatewayState;

/// Primary JSON-RPC entry point
pub async fn post_message(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = framing::session_id_from(&headers);

    match McpRequest::parse(&body) {
        McpRequest::Initialize { id, protocol_version } => {
            let result = json!({
                "protocolVersion": protocol_version.as_deref().unwrap_or(PROTOCOL_VERSION),
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": "gatehouse",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            });
            frame(&state, &session_id, framing::rpc_result(&id, result))
        }
        McpRequest::ToolsList { id } => tools_list(&state, &session_id, &headers, &id).await,
        McpRequest::ToolsCall { id, name, arguments } => {
            tools_call(&state, &session_id, &headers, &id, &name, arguments).await
        }
        McpRequest::Initialized => framing::accepted(&state.cors, &session_id),
        McpRequest::Unknown { id, method } => frame(
            &state,
            &session_id,
            framing::rpc_error(&id, METHOD_NOT_FOUND, &format!("Method not found: {method}")),
        ),
        McpRequest::Invalid { id } => frame(
            &state,
            &session_id,
            framing::rpc_error(&id, INVALID_REQUEST, "Invalid Request"),
        ),
    }
}

/// Keep-alive SSE stream
///
/// Emits one `endpoint` event naming the message URL, then holds the
/// connection open. Nothing else is ever pushed; clients use it as a
/// liveness channel.
pub async fn get_stream(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Response {
    let session_id = framing::session_id_from(&headers);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/mcp/message?session_id={session_id}"));
    let stream = stream::once(async move { Ok::<_, Infallible>(endpoint) })
        .chain(stream::pending());

    let mut response = Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    for (name, value) in framing::cors_headers(&state.cors) {
        if let Some(name) = name {
            response.headers_mut().insert(name, value);
        }
    }
    if let Ok(value) = http::HeaderValue::from_str(&session_id) {
        response
            .headers_mut()
            .insert(http::HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

/// CORS preflight for the MCP routes
pub async fn preflight(State(state): State<Arc<GatewayState>>) -> Response {
    framing::preflight(&state.cors)
}

async fn tools_list(
    state: &Arc<GatewayState>,
    session_id: &str,
    headers: &HeaderMap,
    id: &RpcId,
) -> Response {
    state.manager.refresh_all_tools().await;

    // Listing needs no key, but a valid key narrows the catalog to
    // what that key may actually call.
    let tools = match state.authenticate(headers) {
        Ok(ctx) => state.registry.available_tools(|slug| ctx.can_access_server(slug)),
        Err(_) => state.registry.available_tools(|_| true),
    };

    frame(state, session_id, framing::rpc_result(id, json!({"tools": tools})))
}

async fn tools_call(
    state: &Arc<GatewayState>,
    session_id: &str,
    headers: &HeaderMap,
    id: &RpcId,
    name: &str,
    arguments: Value,
) -> Response {
    let ctx = match state.authenticate(headers) {
        Ok(ctx) => ctx,
        Err(e) => {
            return frame(
                state,
                session_id,
                framing::rpc_error(id, AUTH_REQUIRED, &e.client_message()),
            );
        }
    };

    let started = Instant::now();
    let outcome = execute_tool(state, &ctx, name, arguments).await;
    record_usage(state, &ctx, name, session_id, started, &outcome);

    let payload = match outcome {
        Ok((_, result)) => framing::rpc_result(id, result),
        Err(CallFailure { code, message, .. }) => framing::rpc_error(id, code, &message),
    };
    frame(state, session_id, payload)
}

/// A failed tool call, with its JSON-RPC surface and the slug it got
/// far enough to resolve
pub struct CallFailure {
    pub code: i64,
    pub message: String,
    pub slug: Option<String>,
}

/// Resolve and execute a tool call for an authenticated key
///
/// Shared by the protocol route and the legacy direct-proxy route;
/// only the response surface differs between them.
pub async fn execute_tool(
    state: &Arc<GatewayState>,
    ctx: &KeyContext,
    name: &str,
    arguments: Value,
) -> Result<(String, Value), CallFailure> {
    // Explicit `server:tool` addressing, else discovery by tool name
    let (slug, tool) = match name.split_once(':') {
        Some((server, tool)) => (server.to_string(), tool.to_string()),
        None => {
            let slug = state.registry.find_tool_server(name).map_err(|e| CallFailure {
                code: METHOD_NOT_FOUND,
                message: e.client_message(),
                slug: None,
            })?;
            (slug, name.to_string())
        }
    };

    state.registry.check_routable(&slug).map_err(|e| CallFailure {
        code: METHOD_NOT_FOUND,
        message: e.client_message(),
        slug: Some(slug.clone()),
    })?;

    if !ctx.can_access_server(&slug) {
        return Err(CallFailure {
            code: AUTH_REQUIRED,
            message: format!("API key not authorized for server: {slug}"),
            slug: Some(slug),
        });
    }

    let arguments = if arguments.is_null() { json!({}) } else { arguments };

    let result = if slug == McpConfig::BUILTIN_SLUG {
        state
            .registry
            .call_builtin(&tool, &arguments, Some(ctx.member_level), &state.engine)
            .await
            .map_err(|e| CallFailure {
                code: METHOD_NOT_FOUND,
                message: e.client_message(),
                slug: Some(slug.clone()),
            })?
    } else {
        state
            .manager
            .call_tool(ctx.id, &slug, &tool, arguments)
            .await
            .map_err(|e| CallFailure {
                code: e.rpc_code(),
                message: e.client_message(),
                slug: Some(slug.clone()),
            })?
    };

    Ok((slug, result))
}

fn record_usage(
    state: &Arc<GatewayState>,
    ctx: &KeyContext,
    tool_name: &str,
    session_id: &str,
    started: Instant,
    outcome: &Result<(String, Value), CallFailure>,
) {
    let Some(logger) = &state.usage else {
        return;
    };

    let (server, success, error) = match outcome {
        Ok((slug, _)) => (slug.clone(), true, None),
        Err(failure) => (
            failure.slug.clone().unwrap_or_default(),
            false,
            Some(failure.message.clone()),
        ),
    };

    logger.record(UsageRecord {
        timestamp: Timestamp::now(),
        api_key_id: ctx.id,
        api_key_name: ctx.name.clone(),
        member_id: ctx.member_id,
        server,
        tool: tool_name.to_string(),
        method: "tools/call".to_string(),
        session_id: Some(session_id.to_string()),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        success,
        error,
    });
}

fn frame(state: &Arc<GatewayState>, session_id: &str, payload: Value) -> Response {
    framing::frame_message(&state.cors, session_id, &payload)
}
