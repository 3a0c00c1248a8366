use http::StatusCode;

use gatehouse_core::HttpError;

/// Registry lookup errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No server registered under this slug
    #[error("unknown server: {0}")]
    UnknownServer(String),

    /// Server exists but is inactive or has proxying disabled
    #[error("server not available: {0}")]
    ServerDisabled(String),

    /// Tool name resolves to no server
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl HttpError for RegistryError {
    fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }

    fn error_type(&self) -> &str {
        "registry_error"
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
