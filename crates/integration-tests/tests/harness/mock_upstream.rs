//! Mock upstream MCP server for integration tests
//!
//! Speaks just enough JSON-RPC to satisfy the proxy layer: an
//! initialize handshake with a session header, a fixed tool list, and
//! an echoing tools/call. Can answer with plain JSON bodies or with
//! SSE-framed ones, since real upstreams do both.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Mock upstream that returns predictable tool results
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    initialize_count: AtomicU32,
    tools_list_count: AtomicU32,
    call_count: AtomicU32,
    /// Wrap responses in `event: message` SSE framing
    framed: bool,
    /// Last Authorization or X-API-Key header seen
    last_auth: Mutex<Option<String>>,
}

impl MockUpstream {
    /// Start a mock that answers with plain JSON bodies
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(false).await
    }

    /// Start a mock that answers with SSE-framed bodies
    pub async fn start_framed() -> anyhow::Result<Self> {
        Self::start_inner(true).await
    }

    async fn start_inner(framed: bool) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            initialize_count: AtomicU32::new(0),
            tools_list_count: AtomicU32::new(0),
            call_count: AtomicU32::new(0),
            framed,
            last_auth: Mutex::new(None),
        });

        let app = Router::new()
            .route("/mcp", routing::post(handle_rpc))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Endpoint URL for registering the mock as an upstream server
    pub fn endpoint(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }

    /// Number of initialize handshakes received
    pub fn initialize_count(&self) -> u32 {
        self.state.initialize_count.load(Ordering::Relaxed)
    }

    /// Number of tools/list requests received
    pub fn tools_list_count(&self) -> u32 {
        self.state.tools_list_count.load(Ordering::Relaxed)
    }

    /// Number of tools/call requests received
    pub fn call_count(&self) -> u32 {
        self.state.call_count.load(Ordering::Relaxed)
    }

    /// Last Authorization or X-API-Key header value seen
    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_auth.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_rpc(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get("x-api-key"))
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    if auth.is_some() {
        *state.last_auth.lock().unwrap() = auth;
    }

    let request: Value = serde_json::from_slice(&body).expect("mock received JSON");
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();

    match method {
        "initialize" => {
            state.initialize_count.fetch_add(1, Ordering::Relaxed);
            let result = json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mock-upstream", "version": "0.1.0"},
            });
            let mut response = reply(&state, &id, result);
            response.headers_mut().insert(
                header::HeaderName::from_static("mcp-session-id"),
                header::HeaderValue::from_static("mock-session-1"),
            );
            response
        }
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" => {
            state.tools_list_count.fetch_add(1, Ordering::Relaxed);
            reply(&state, &id, json!({"tools": tool_descriptors()}))
        }
        "tools/call" => {
            state.call_count.fetch_add(1, Ordering::Relaxed);
            let tool = request["params"]["name"].as_str().unwrap_or_default();
            let url = request["params"]["arguments"]["url"].as_str().unwrap_or("-");
            let result = json!({
                "content": [{"type": "text", "text": format!("mock:{tool}:{url}")}]
            });
            reply(&state, &id, result)
        }
        other => reply(
            &state,
            &id,
            json!({"error": {"code": -32601, "message": format!("unknown method {other}")}}),
        ),
    }
}

/// Tool list as a sloppy registry would publish it: internal fields
/// and an empty-array properties schema the gateway must sanitize
fn tool_descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "browse",
            "server": "mock",
            "description": "Fetches a web page.",
            "inputSchema": {
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "additionalProperties": false,
                "properties": []
            }
        }),
        json!({
            "name": "fetch_json",
            "description": "Fetches a JSON document.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": {"type": "string"}
                },
                "required": ["url"]
            }
        }),
    ]
}

fn reply(state: &MockState, id: &Value, result: Value) -> Response {
    let payload = if result.get("error").is_some() {
        json!({"jsonrpc": "2.0", "id": id, "error": result["error"]})
    } else {
        json!({"jsonrpc": "2.0", "id": id, "result": result})
    };

    if state.framed {
        let body = format!("event: message\ndata: {payload}\n\n");
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    } else {
        ([(header::CONTENT_TYPE, "application/json")], payload.to_string()).into_response()
    }
}
