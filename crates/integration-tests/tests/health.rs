mod harness;

use harness::config::ConfigBuilder;
use harness::server::TestServer;

#[tokio::test]
async fn health_endpoint_reports_status() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "gatehouse");
    assert_eq!(body["mcp_sessions"], 0);
    assert!(!body["version"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let server = TestServer::start(ConfigBuilder::new().without_health().build())
        .await
        .unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 404);
}
