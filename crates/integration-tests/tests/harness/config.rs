//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use secrecy::SecretString;

use gatehouse_config::{
    ApiKeyConfig, AuthConfig, Config, McpConfig, RuleAction, RuleTarget, SecurityConfig,
    SecurityRuleConfig, ServerConfig, UpstreamAuth, UpstreamServerConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults bound to port 0
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                auth: AuthConfig::default(),
                security: SecurityConfig::default(),
                mcp: McpConfig::default(),
            },
        }
    }

    /// Add an active unrestricted API key
    pub fn with_key(self, id: i64, token: &str) -> Self {
        self.with_key_config(ApiKeyConfig {
            id,
            name: format!("test-key-{id}"),
            token: SecretString::from(token),
            member_id: id,
            member_level: 100,
            scopes: vec!["mcp:*".to_string()],
            allowed_servers: Vec::new(),
            is_active: true,
            expires_at: None,
        })
    }

    /// Add a fully specified API key
    pub fn with_key_config(mut self, key: ApiKeyConfig) -> Self {
        self.config.auth.keys.push(key);
        self
    }

    /// Add an active sandbox rule at the default priority
    pub fn with_rule(self, id: i64, target: RuleTarget, action: RuleAction, pattern: &str) -> Self {
        self.with_rule_config(SecurityRuleConfig {
            id,
            name: format!("rule-{id}"),
            target,
            action,
            pattern: pattern.to_string(),
            level: None,
            priority: 100,
            is_active: true,
            description: String::new(),
        })
    }

    /// Add a fully specified sandbox rule
    pub fn with_rule_config(mut self, rule: SecurityRuleConfig) -> Self {
        self.config.security.rules.push(rule);
        self
    }

    /// Register an upstream MCP server with no auth and no seed tools
    pub fn with_server(self, slug: &str, endpoint: &str) -> Self {
        self.with_server_config(
            slug,
            UpstreamServerConfig {
                name: slug.to_string(),
                endpoint_url: endpoint.parse().expect("valid URL"),
                auth: UpstreamAuth::None,
                tools: Vec::new(),
                status: gatehouse_config::ServerStatus::Active,
                proxy_enabled: true,
            },
        )
    }

    /// Register a fully specified upstream server
    pub fn with_server_config(mut self, slug: &str, server: UpstreamServerConfig) -> Self {
        self.config.mcp.servers.insert(slug.to_string(), server);
        self
    }

    /// Disable the health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
