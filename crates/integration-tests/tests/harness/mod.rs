#![allow(dead_code)]

pub mod config;
pub mod mock_upstream;
pub mod server;

/// Extract the JSON payload from an SSE-framed protocol reply
///
/// Every reply on the message route is a single `event: message`
/// frame; this pulls the `data:` line out and parses it.
pub fn unframe(body: &str) -> serde_json::Value {
    assert!(
        body.starts_with("event: message\n"),
        "expected SSE framing, got: {body}"
    );
    let data = body
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("framed reply carries a data line");
    serde_json::from_str(data).expect("framed payload is JSON")
}
