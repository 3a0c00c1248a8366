use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address (defaults to 0.0.0.0:9501)
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Health endpoint configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_health_path(),
        }
    }
}

/// CORS headers attached to every MCP response
///
/// The MCP transport requires permissive CORS; these defaults mirror
/// what coding-agent HTTP clients expect and should rarely change.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    #[serde(default = "default_origin")]
    pub allow_origin: String,
    #[serde(default = "default_methods")]
    pub allow_methods: String,
    #[serde(default = "default_headers")]
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_origin(),
            allow_methods: default_methods(),
            allow_headers: default_headers(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_origin() -> String {
    "*".to_string()
}

fn default_methods() -> String {
    "GET, POST, OPTIONS".to_string()
}

fn default_headers() -> String {
    "Content-Type, Authorization, X-API-Key, mcp-session-id".to_string()
}
