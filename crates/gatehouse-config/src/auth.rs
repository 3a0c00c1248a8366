use jiff::Timestamp;
use secrecy::SecretString;
use serde::Deserialize;

/// Authentication configuration: the API key roster and usage logging
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// API keys accepted by the gateway
    #[serde(default)]
    pub keys: Vec<ApiKeyConfig>,
    /// Verdict cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default)]
    pub usage_log: Option<UsageLogConfig>,
}

/// A single API key record
///
/// Seeded from config; the member subsystem that mints these lives
/// outside the gateway, which only needs the fields below.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyConfig {
    pub id: i64,
    pub name: String,
    pub token: SecretString,
    /// Owning member id, carried through to usage logs
    #[serde(default)]
    pub member_id: i64,
    /// Member privilege level (lower = more privileged)
    #[serde(default = "default_level")]
    pub member_level: i64,
    /// Capability scopes, e.g. `mcp:*`
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Server slugs this key may call; empty means unrestricted
    #[serde(default)]
    pub allowed_servers: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

/// Append-only usage log sink
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsageLogConfig {
    /// File receiving one JSON record per tool call
    pub path: std::path::PathBuf,
    /// In-memory buffer size; the oldest entry is dropped when full
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    /// Flush interval in seconds
    #[serde(default = "default_flush")]
    pub flush_interval: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_level() -> i64 {
    100
}

const fn default_cache_ttl() -> u64 {
    60
}

const fn default_buffer() -> usize {
    4096
}

const fn default_flush() -> u64 {
    5
}
