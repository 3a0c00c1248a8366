use std::sync::Arc;
use std::time::Instant;

use http::HeaderMap;

use gatehouse_auth::{AuthError, KeyContext, Keyring, UsageLogger};
use gatehouse_config::{Config, CorsConfig};
use gatehouse_proxy::ConnectionManager;
use gatehouse_registry::ServerRegistry;
use gatehouse_rules::RuleEngine;

/// Everything the request handlers share
pub struct GatewayState {
    pub keyring: Keyring,
    pub engine: RuleEngine,
    pub registry: ServerRegistry,
    pub manager: ConnectionManager,
    pub usage: Option<UsageLogger>,
    pub cors: CorsConfig,
    pub started: Instant,
}

impl GatewayState {
    /// Wire the subsystems together from configuration
    ///
    /// Must run inside a tokio runtime; the usage logger spawns its
    /// flusher here.
    pub fn new(config: &Config) -> Arc<Self> {
        let registry = ServerRegistry::new(&config.mcp);
        let manager = ConnectionManager::new(&config.mcp, registry.tool_cache());
        let usage = config.auth.usage_log.as_ref().map(UsageLogger::spawn);

        Arc::new(Self {
            keyring: Keyring::new(&config.auth),
            engine: RuleEngine::new(&config.security),
            registry,
            manager,
            usage,
            cors: config.server.cors.clone(),
            started: Instant::now(),
        })
    }

    /// Authenticate from either accepted credential header
    ///
    /// `X-API-Key` wins over `Authorization` when both are present.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Arc<KeyContext>, AuthError> {
        let raw = headers
            .get("x-api-key")
            .or_else(|| headers.get(http::header::AUTHORIZATION))
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        self.keyring.authenticate(raw)
    }
}
