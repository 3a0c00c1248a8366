use serde::Deserialize;
use serde_json::Value;

use gatehouse_core::RpcId;

/// Raw JSON-RPC envelope as received
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: RpcId,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

/// A parsed inbound MCP message
///
/// Parsing never fails: anything that does not fit becomes `Invalid`
/// or `Unknown` so the state machine can answer with the right
/// JSON-RPC error instead of a transport-level rejection.
#[derive(Debug)]
pub enum McpRequest {
    Initialize {
        id: RpcId,
        protocol_version: Option<String>,
    },
    ToolsList {
        id: RpcId,
    },
    ToolsCall {
        id: RpcId,
        name: String,
        arguments: Value,
    },
    /// `notifications/initialized`, acknowledged with an empty 202
    Initialized,
    /// Well-formed envelope, method we do not implement
    Unknown {
        id: RpcId,
        method: String,
    },
    /// Body without a `method` field, or not JSON at all
    Invalid {
        id: RpcId,
    },
}

impl McpRequest {
    pub fn parse(body: &[u8]) -> Self {
        let Ok(envelope) = serde_json::from_slice::<Envelope>(body) else {
            return Self::Invalid { id: RpcId::Null };
        };
        let Some(method) = envelope.method else {
            return Self::Invalid { id: envelope.id };
        };

        match method.as_str() {
            "initialize" => Self::Initialize {
                id: envelope.id,
                protocol_version: envelope.params["protocolVersion"]
                    .as_str()
                    .map(ToString::to_string),
            },
            "tools/list" => Self::ToolsList { id: envelope.id },
            "tools/call" => {
                let name = envelope.params["name"].as_str().unwrap_or_default().to_string();
                let arguments = envelope.params.get("arguments").cloned().unwrap_or(Value::Null);
                Self::ToolsCall {
                    id: envelope.id,
                    name,
                    arguments,
                }
            }
            "notifications/initialized" => Self::Initialized,
            _ => Self::Unknown {
                id: envelope.id,
                method,
            },
        }
    }
}
