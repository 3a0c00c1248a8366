use http::StatusCode;
use thiserror::Error;

use gatehouse_core::HttpError;

/// Proxy subsystem errors
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connection or protocol-level failure talking to an upstream
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream's initialize handshake did not complete
    #[error("handshake with {server} failed: {reason}")]
    Handshake { server: String, reason: String },

    /// Upstream answered with a JSON-RPC error object
    #[error("upstream error {code}: {message}")]
    Upstream { code: i64, message: String },

    /// Tool call exceeded the configured deadline
    #[error("tool call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl ProxyError {
    /// JSON-RPC error code surfaced to the calling client
    pub const fn rpc_code(&self) -> i64 {
        match self {
            Self::Upstream { code, .. } => *code,
            Self::Transport(_) | Self::Handshake { .. } | Self::Timeout { .. } => -32001,
        }
    }
}

impl HttpError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) | Self::Handshake { .. } => StatusCode::BAD_GATEWAY,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Handshake { .. } => "handshake_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Timeout { .. } => "timeout",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Transport(_) => "failed to communicate with MCP server".to_string(),
            Self::Handshake { server, .. } => {
                format!("failed to establish session with MCP server: {server}")
            }
            Self::Upstream { message, .. } => message.clone(),
            Self::Timeout { seconds } => format!("tool call timed out after {seconds}s"),
        }
    }
}
