use serde::{Deserialize, Serialize};

/// Default MCP protocol version advertised when a client omits one
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code: request body missing the `method` field
pub const INVALID_REQUEST: i64 = -32600;

/// JSON-RPC error code: unknown method or unresolvable tool
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC error code: authentication required or failed
pub const AUTH_REQUIRED: i64 = -32000;

/// A JSON-RPC request/response id
///
/// The protocol allows numbers, strings, or null; the gateway echoes
/// whatever the client sent without interpreting it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RpcId {
    #[default]
    Null,
    Number(i64),
    String(String),
}
