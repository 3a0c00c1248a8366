//! Tests for the management endpoints and the legacy direct proxy

mod harness;

use harness::config::ConfigBuilder;
use harness::mock_upstream::MockUpstream;
use harness::server::TestServer;

use secrecy::SecretString;
use serde_json::json;

use gatehouse_config::ApiKeyConfig;

#[tokio::test]
async fn legacy_proxy_requires_a_key() {
    let server = TestServer::start(ConfigBuilder::new().with_key(1, "k-1").build())
        .await
        .unwrap();

    let body = json!({"server": "gatehouse", "tool": "hello", "arguments": {}});
    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["error"]["type"], "auth_error");
}

#[tokio::test]
async fn legacy_proxy_invokes_builtin_tools() {
    let server = TestServer::start(ConfigBuilder::new().with_key(1, "k-1").build())
        .await
        .unwrap();

    let body = json!({"server": "gatehouse", "tool": "hello", "arguments": {"name": "Ada"}});
    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .header("x-api-key", "k-1")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    // Bare JSON body, no SSE framing on the legacy route
    let result: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        result["content"][0]["text"],
        "Hello, Ada! Welcome to Gatehouse MCP."
    );
}

#[tokio::test]
async fn legacy_proxy_rejects_malformed_bodies() {
    let server = TestServer::start(ConfigBuilder::new().with_key(1, "k-1").build())
        .await
        .unwrap();

    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .header("x-api-key", "k-1")
        .body("{\"tool\": \"hello\"}")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn legacy_proxy_maps_unknown_tools_to_404() {
    let server = TestServer::start(ConfigBuilder::new().with_key(1, "k-1").build())
        .await
        .unwrap();

    let body = json!({"server": "gatehouse", "tool": "no_such_tool", "arguments": {}});
    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .header("x-api-key", "k-1")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let error: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(error["error"]["type"], "tool_call_failed");
}

#[tokio::test]
async fn legacy_proxy_maps_allowlist_denial_to_403() {
    let server = TestServer::start(
        ConfigBuilder::new()
            .with_key_config(ApiKeyConfig {
                id: 2,
                name: "restricted".to_string(),
                token: SecretString::from("k-2"),
                member_id: 2,
                member_level: 100,
                scopes: Vec::new(),
                allowed_servers: vec!["somewhere-else".to_string()],
                is_active: true,
                expires_at: None,
            })
            .build(),
    )
    .await
    .unwrap();

    let body = json!({"server": "gatehouse", "tool": "hello", "arguments": {}});
    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .header("x-api-key", "k-2")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn legacy_proxy_rejects_expired_keys() {
    let server = TestServer::start(
        ConfigBuilder::new()
            .with_key_config(ApiKeyConfig {
                id: 3,
                name: "expired".to_string(),
                token: SecretString::from("k-3"),
                member_id: 3,
                member_level: 100,
                scopes: vec!["mcp:*".to_string()],
                allowed_servers: Vec::new(),
                is_active: true,
                expires_at: Some("2020-01-01T00:00:00Z".parse().unwrap()),
            })
            .build(),
    )
    .await
    .unwrap();

    let body = json!({"server": "gatehouse", "tool": "hello", "arguments": {}});
    let resp = server
        .client()
        .post(server.url("/mcp/proxy"))
        .header("x-api-key", "k-3")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn tools_catalog_groups_by_server() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_server("mock", &mock.endpoint())
        .build();
    let server = TestServer::start(config).await.unwrap();

    let catalog: serde_json::Value = server
        .client()
        .get(server.url("/mcp/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(catalog["count"], 1);
    let servers = catalog["servers"].as_array().unwrap();
    assert_eq!(servers[0]["slug"], "mock");
    assert_eq!(servers[0]["status"], "active");

    let tools = servers[0]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert!(names.contains(&"browse"));
    assert!(names.contains(&"fetch_json"));
}
