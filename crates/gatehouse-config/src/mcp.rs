use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// MCP gateway configuration
///
/// `servers` is an ordered map: registration order decides tool-name
/// collisions (first registered wins), so it must be stable.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpConfig {
    /// Upstream MCP server registrations keyed by slug
    #[serde(default)]
    pub servers: IndexMap<String, UpstreamServerConfig>,
    /// Seconds a cached upstream tool list stays fresh
    #[serde(default = "default_tools_ttl")]
    pub tools_cache_ttl: u64,
    /// Seconds an idle upstream session survives
    #[serde(default = "default_session_ttl")]
    pub session_idle_ttl: u64,
    /// Seconds between expiry sweeps
    #[serde(default = "default_sweep_interval")]
    pub cleanup_interval: u64,
    /// Per-call upstream timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout: u64,
}

impl McpConfig {
    /// Slug of the pseudo-server backing built-in tools
    pub const BUILTIN_SLUG: &'static str = "gatehouse";
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            servers: IndexMap::new(),
            tools_cache_ttl: default_tools_ttl(),
            session_idle_ttl: default_session_ttl(),
            cleanup_interval: default_sweep_interval(),
            call_timeout: default_call_timeout(),
        }
    }
}

/// A registered upstream MCP server
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamServerConfig {
    pub name: String,
    pub endpoint_url: Url,
    #[serde(default)]
    pub auth: UpstreamAuth,
    /// Tool descriptors known at registration time; refreshed at
    /// runtime via the upstream's own tools/list
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default = "default_true")]
    pub proxy_enabled: bool,
}

/// Upstream server lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Active,
    Inactive,
    Deprecated,
}

/// How the gateway authenticates to an upstream server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpstreamAuth {
    #[default]
    None,
    Bearer {
        token: SecretString,
    },
    Basic {
        credentials: SecretString,
    },
    ApiKey {
        token: SecretString,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_tools_ttl() -> u64 {
    300
}

const fn default_session_ttl() -> u64 {
    1800
}

const fn default_sweep_interval() -> u64 {
    300
}

const fn default_call_timeout() -> u64 {
    120
}
