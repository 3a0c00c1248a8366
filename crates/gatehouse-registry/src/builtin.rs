//! Tools served by the gateway itself, no upstream involved
//!
//! These exist so a client can exercise the full pipeline (including
//! the sandbox, via `read_file`) without any upstream server
//! registered.

use jiff::Zoned;
use jiff::tz::TimeZone;
use serde_json::{Value, json};

use gatehouse_rules::RuleEngine;

use crate::catalog::ServerSummary;

/// Hard cap on `read_file` output
const READ_FILE_MAX_BYTES: usize = 65_536;

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tool descriptors, in catalog order
pub fn descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "hello",
            "description": "Returns a friendly greeting. Use this to test the MCP connection.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Name to greet (optional)"}
                },
                "required": []
            }
        }),
        json!({
            "name": "echo",
            "description": "Echoes back the provided message. Useful for testing.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message": {"type": "string", "description": "Message to echo back"}
                },
                "required": ["message"]
            }
        }),
        json!({
            "name": "get_time",
            "description": "Returns the current server date and time.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "timezone": {"type": "string", "description": "IANA timezone (e.g. \"America/New_York\"). Defaults to UTC."},
                    "format": {"type": "string", "description": "strftime format string. Defaults to \"%Y-%m-%d %H:%M:%S\"."}
                },
                "required": []
            }
        }),
        json!({
            "name": "add_numbers",
            "description": "Adds two numbers together and returns the result.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": {"type": "number", "description": "First number"},
                    "b": {"type": "number", "description": "Second number"}
                },
                "required": ["a", "b"]
            }
        }),
        json!({
            "name": "list_servers",
            "description": "Lists MCP servers registered with the gateway.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
        json!({
            "name": "read_file",
            "description": "Reads a text file from the gateway host, subject to the security sandbox.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Absolute path to read"}
                },
                "required": ["path"]
            }
        }),
    ]
}

pub fn contains(name: &str) -> bool {
    matches!(
        name,
        "hello" | "echo" | "get_time" | "add_numbers" | "list_servers" | "read_file"
    )
}

/// Execute a built-in tool
///
/// Tool-level failures (bad arguments, sandbox denial, unreadable
/// file) come back as an `isError` tool result, never as an `Err`:
/// the call itself succeeded, the tool did not.
pub async fn call(
    name: &str,
    args: &Value,
    actor_level: Option<i64>,
    engine: &RuleEngine,
    servers: &[ServerSummary],
) -> Option<Value> {
    let result = match name {
        "hello" => {
            let who = args["name"].as_str().unwrap_or("World");
            text_result(format!("Hello, {who}! Welcome to Gatehouse MCP."))
        }
        "echo" => match args["message"].as_str() {
            Some(message) => text_result(message.to_string()),
            None => error_result("Missing required argument: message".to_string()),
        },
        "get_time" => get_time(args),
        "add_numbers" => {
            let a = args["a"].as_f64().unwrap_or(0.0);
            let b = args["b"].as_f64().unwrap_or(0.0);
            text_result(format_number(a + b))
        }
        "list_servers" => {
            // Serializing plain summaries cannot fail
            let listing = serde_json::to_string_pretty(servers).unwrap_or_default();
            text_result(listing)
        }
        "read_file" => read_file(args, actor_level, engine).await,
        _ => return None,
    };
    Some(result)
}

fn get_time(args: &Value) -> Value {
    let tz = match args["timezone"].as_str() {
        Some(name) => match TimeZone::get(name) {
            Ok(tz) => tz,
            Err(_) => return error_result(format!("Invalid timezone: {name}")),
        },
        None => TimeZone::UTC,
    };
    let format = args["format"].as_str().unwrap_or(DEFAULT_TIME_FORMAT);
    let now = Zoned::now().with_time_zone(tz);
    match jiff::fmt::strtime::format(format, &now) {
        Ok(formatted) => text_result(formatted),
        Err(_) => error_result(format!("Invalid format: {format}")),
    }
}

async fn read_file(args: &Value, actor_level: Option<i64>, engine: &RuleEngine) -> Value {
    let Some(path) = args["path"].as_str() else {
        return error_result("Missing required argument: path".to_string());
    };

    let decision = engine.check_path(path, actor_level, false);
    if !decision.allowed {
        return error_result(format!("Access denied: {}", decision.reason));
    }

    match tokio::fs::read_to_string(path).await {
        Ok(mut contents) => {
            if contents.len() > READ_FILE_MAX_BYTES {
                let mut cut = READ_FILE_MAX_BYTES;
                while !contents.is_char_boundary(cut) {
                    cut -= 1;
                }
                contents.truncate(cut);
                contents.push_str("\n… (truncated)");
            }
            text_result(contents)
        }
        Err(e) => error_result(format!("Cannot read {path}: {e}")),
    }
}

/// Render a sum without a trailing `.0` when it is integral
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn text_result(text: String) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}

fn error_result(text: String) -> Value {
    json!({"content": [{"type": "text", "text": text}], "isError": true})
}
