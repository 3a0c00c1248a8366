use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret as _;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use gatehouse_config::{UpstreamAuth, UpstreamServerConfig};
use gatehouse_core::PROTOCOL_VERSION;

use crate::error::ProxyError;

/// Response header carrying the upstream's session id
const SESSION_HEADER: &str = "mcp-session-id";

/// One JSON-RPC connection to an upstream MCP server
///
/// The first request runs the initialize handshake and captures the
/// session id the upstream hands back; every later request replays it.
/// Upstreams answer either with plain JSON or with the same response
/// wrapped in SSE framing, so both body shapes are accepted.
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: Url,
    auth: UpstreamAuth,
    server: String,
    session: Mutex<Option<String>>,
    next_id: AtomicI64,
}

impl UpstreamClient {
    pub fn new(
        slug: &str,
        config: &UpstreamServerConfig,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint_url.clone(),
            auth: config.auth.clone(),
            server: slug.to_string(),
            session: Mutex::new(None),
            next_id: AtomicI64::new(1),
        })
    }

    /// List the upstream's tools
    pub async fn list_tools(&self) -> Result<Vec<Value>, ProxyError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result["tools"].as_array().cloned().unwrap_or_default();
        Ok(tools)
    }

    /// Call a tool, returning the raw MCP tool result
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ProxyError> {
        self.request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }

    /// Send a request, initializing the session first when needed
    ///
    /// A transport failure drops the session and retries once with a
    /// fresh handshake; upstreams restart and forget session ids.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ProxyError> {
        self.ensure_initialized().await?;

        match self.send(method, params.clone()).await {
            Ok(result) => Ok(result),
            Err(ProxyError::Transport(reason)) => {
                tracing::warn!(server = %self.server, %reason, "upstream transport failure, re-initializing");
                *self.session.lock().await = None;
                self.ensure_initialized().await?;
                self.send(method, params).await
            }
            Err(other) => Err(other),
        }
    }

    async fn ensure_initialized(&self) -> Result<(), ProxyError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "gatehouse",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let response = self
            .post_rpc("initialize", params, Some(self.next_id.fetch_add(1, Ordering::Relaxed)), None)
            .await?;

        let upstream_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| ProxyError::Transport(format!("reading initialize response: {e}")))?;
        let message = parse_rpc_body(&body).ok_or_else(|| ProxyError::Handshake {
            server: self.server.clone(),
            reason: "unparseable initialize response".to_string(),
        })?;
        if message.get("result").is_none() {
            return Err(ProxyError::Handshake {
                server: self.server.clone(),
                reason: message["error"]["message"]
                    .as_str()
                    .unwrap_or("initialize rejected")
                    .to_string(),
            });
        }

        // The upstream may or may not issue a session id; either way
        // mark the handshake done so we only run it once.
        *session = Some(upstream_session.unwrap_or_default());

        // Fire the initialized notification; a failure here is not
        // fatal, some servers never read it.
        let sid = session.clone();
        if let Err(e) = self
            .post_rpc("notifications/initialized", json!({}), None, sid.as_deref())
            .await
        {
            tracing::debug!(server = %self.server, error = %e, "initialized notification not accepted");
        }

        tracing::info!(server = %self.server, "upstream session initialized");
        Ok(())
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, ProxyError> {
        let session = self.session.lock().await.clone();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .post_rpc(method, params, Some(id), session.as_deref().filter(|s| !s.is_empty()))
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProxyError::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(ProxyError::Transport(format!(
                "upstream {} returned HTTP {status}",
                self.server
            )));
        }

        let message = parse_rpc_body(&body)
            .ok_or_else(|| ProxyError::Transport(format!("unparseable response from {}", self.server)))?;

        if let Some(error) = message.get("error") {
            return Err(ProxyError::Upstream {
                code: error["code"].as_i64().unwrap_or(-32603),
                message: error["message"].as_str().unwrap_or("upstream error").to_string(),
            });
        }

        if message.get("result").is_none() {
            return Err(ProxyError::Transport(format!(
                "response from {} carries neither result nor error",
                self.server
            )));
        }

        Ok(message["result"].clone())
    }

    async fn post_rpc(
        &self,
        method: &str,
        params: Value,
        id: Option<i64>,
        session: Option<&str>,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        if let Some(id) = id {
            body["id"] = json!(id);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        if let Some(session) = session
            && let Ok(value) = HeaderValue::from_str(session)
        {
            headers.insert(SESSION_HEADER, value);
        }
        self.apply_auth(&mut headers)?;

        self.http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProxyError::Transport(format!("request to {} failed: {e}", self.server)))
    }

    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<(), ProxyError> {
        let (name, value) = match &self.auth {
            UpstreamAuth::None => return Ok(()),
            UpstreamAuth::Bearer { token } => (
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            UpstreamAuth::Basic { credentials } => (
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", credentials.expose_secret()),
            ),
            UpstreamAuth::ApiKey { token } => (
                reqwest::header::HeaderName::from_static("x-api-key"),
                token.expose_secret().to_string(),
            ),
        };
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ProxyError::Transport(format!("invalid upstream credential: {e}")))?;
        headers.insert(name, value);
        Ok(())
    }
}

/// Parse an upstream response body: plain JSON, or SSE framing with
/// the JSON-RPC message in `data:` lines
fn parse_rpc_body(body: &str) -> Option<Value> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with("event:") && !trimmed.starts_with("data:") {
        return serde_json::from_str(trimmed).ok();
    }

    for event in trimmed.split("\n\n") {
        let data: String = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");
        if data.is_empty() {
            continue;
        }
        if let Ok(message) = serde_json::from_str::<Value>(&data)
            && (message.get("result").is_some() || message.get("error").is_some())
        {
            return Some(message);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_bodies_parse() {
        let message = parse_rpc_body(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert_eq!(message["result"]["ok"], true);
    }

    #[test]
    fn sse_framed_bodies_parse() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"tools\":[]}}\n\n";
        let message = parse_rpc_body(body).unwrap();
        assert!(message["result"]["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn sse_bodies_skip_non_response_events() {
        let body = concat!(
            "event: endpoint\ndata: /messages?sessionId=abc\n\n",
            "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"error\":{\"code\":-32601,\"message\":\"no\"}}\n\n",
        );
        let message = parse_rpc_body(body).unwrap();
        assert_eq!(message["error"]["code"], -32601);
    }

    #[test]
    fn garbage_bodies_are_rejected() {
        assert!(parse_rpc_body("<html>bad gateway</html>").is_none());
        assert!(parse_rpc_body("event: message\ndata: not-json\n\n").is_none());
    }
}
