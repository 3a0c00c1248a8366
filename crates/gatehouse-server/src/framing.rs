use std::fmt::Write as _;

use axum::response::{IntoResponse, Response};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{Value, json};

use gatehouse_config::CorsConfig;
use gatehouse_core::RpcId;

/// Session correlation header, inbound and outbound
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Wrap a JSON-RPC payload in SSE framing
///
/// Every protocol reply, success or error, goes through here: the
/// client ecosystem's transport expects `event: message` framing
/// unconditionally, even where a bare JSON body would carry the same
/// information. Keep that quirk in this one function.
pub fn frame_message(cors: &CorsConfig, session_id: &str, payload: &Value) -> Response {
    let body = format!("event: message\ndata: {payload}\n\n");

    let mut headers = cors_headers(cors);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    insert_session(&mut headers, session_id);

    (StatusCode::OK, headers, body).into_response()
}

/// Empty 202 for notifications
pub fn accepted(cors: &CorsConfig, session_id: &str) -> Response {
    let mut headers = cors_headers(cors);
    insert_session(&mut headers, session_id);
    (StatusCode::ACCEPTED, headers).into_response()
}

/// CORS preflight: 204, no body, before any dispatch
pub fn preflight(cors: &CorsConfig) -> Response {
    (StatusCode::NO_CONTENT, cors_headers(cors)).into_response()
}

pub fn rpc_result(id: &RpcId, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

pub fn rpc_error(id: &RpcId, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// Permissive CORS headers carried on every MCP response
pub fn cors_headers(cors: &CorsConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_str(&mut headers, "access-control-allow-origin", &cors.allow_origin);
    insert_str(&mut headers, "access-control-allow-methods", &cors.allow_methods);
    insert_str(&mut headers, "access-control-allow-headers", &cors.allow_headers);
    headers
}

/// Inbound session id when the client sent one, else a fresh
/// 128-bit hex id
pub fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map_or_else(new_session_id, ToString::to_string)
}

fn new_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut id = String::with_capacity(32);
    for byte in bytes {
        // Writing hex to a String is infallible
        write!(id, "{byte:02x}").unwrap();
    }
    id
}

fn insert_session(headers: &mut HeaderMap, session_id: &str) {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        headers.insert(HeaderName::from_static(SESSION_HEADER), value);
    }
}

fn insert_str(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
