#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Configuration for the gatehouse gateway
//!
//! A single TOML file describes the listening server, the API keys,
//! the security sandbox rules, and the upstream MCP server registry.
//! `{{ env.VAR }}` placeholders are expanded before deserialization so
//! secrets stay out of the file itself.

mod auth;
mod env;
mod loader;
mod mcp;
mod security;
mod server;

use serde::Deserialize;

pub use auth::{ApiKeyConfig, AuthConfig, UsageLogConfig};
pub use mcp::{McpConfig, ServerStatus, UpstreamAuth, UpstreamServerConfig};
pub use security::{RuleAction, RuleTarget, SecurityConfig, SecurityRuleConfig};
pub use server::{CorsConfig, HealthConfig, ServerConfig};

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}
