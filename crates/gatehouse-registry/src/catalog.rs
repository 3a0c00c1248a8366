use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use gatehouse_config::{McpConfig, ServerStatus, UpstreamServerConfig};
use gatehouse_rules::RuleEngine;

use crate::cache::ToolCache;
use crate::error::RegistryError;
use crate::builtin;

/// One registered server as reported by `list_servers` and the
/// management endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    pub slug: String,
    pub name: String,
    pub status: ServerStatus,
    pub tool_count: usize,
}

struct ServerEntry {
    name: String,
    status: ServerStatus,
    proxy_enabled: bool,
    /// Tool descriptors seeded from configuration, used until the
    /// proxy layer has fetched a live list
    seed_tools: Vec<Value>,
}

impl ServerEntry {
    const fn routable(&self) -> bool {
        matches!(self.status, ServerStatus::Active) && self.proxy_enabled
    }
}

/// The server catalog
///
/// Holds registration order, which is load-bearing: when two servers
/// expose the same tool name, the first registered wins. The built-in
/// pseudo-server outranks them all.
pub struct ServerRegistry {
    servers: IndexMap<String, ServerEntry>,
    cache: Arc<ToolCache>,
}

impl ServerRegistry {
    pub fn new(config: &McpConfig) -> Self {
        let servers = config
            .servers
            .iter()
            .map(|(slug, server)| (slug.clone(), Self::entry(server)))
            .collect();
        let cache = Arc::new(ToolCache::new(Duration::from_secs(config.tools_cache_ttl)));
        Self { servers, cache }
    }

    fn entry(server: &UpstreamServerConfig) -> ServerEntry {
        ServerEntry {
            name: server.name.clone(),
            status: server.status,
            proxy_enabled: server.proxy_enabled,
            seed_tools: server.tools.clone(),
        }
    }

    /// The live tool cache, shared with the proxy layer that fills it
    pub fn tool_cache(&self) -> Arc<ToolCache> {
        Arc::clone(&self.cache)
    }

    /// Whether a slug may receive proxied calls
    pub fn check_routable(&self, slug: &str) -> Result<(), RegistryError> {
        if slug == McpConfig::BUILTIN_SLUG {
            return Ok(());
        }
        let entry = self
            .servers
            .get(slug)
            .ok_or_else(|| RegistryError::UnknownServer(slug.to_string()))?;
        if entry.routable() {
            Ok(())
        } else {
            Err(RegistryError::ServerDisabled(slug.to_string()))
        }
    }

    /// Current tool list for a server: the live cache when the proxy
    /// has one, otherwise the configured seed
    pub fn tools_for(&self, slug: &str) -> Vec<Value> {
        if slug == McpConfig::BUILTIN_SLUG {
            return builtin::descriptors();
        }
        if let Some(tools) = self.cache.get(slug) {
            return tools;
        }
        self.servers
            .get(slug)
            .map(|e| e.seed_tools.clone())
            .unwrap_or_default()
    }

    /// Resolve a tool name to the slug that serves it
    ///
    /// Built-in tools first, then registered servers in registration
    /// order; inactive or proxy-disabled servers never match.
    pub fn find_tool_server(&self, tool_name: &str) -> Result<String, RegistryError> {
        if builtin::contains(tool_name) {
            return Ok(McpConfig::BUILTIN_SLUG.to_string());
        }

        for (slug, entry) in &self.servers {
            if !entry.routable() {
                continue;
            }
            let owns = self
                .tools_for(slug)
                .iter()
                .any(|t| t["name"].as_str() == Some(tool_name));
            if owns {
                return Ok(slug.clone());
            }
        }

        Err(RegistryError::UnknownTool(tool_name.to_string()))
    }

    /// The merged tool catalog a caller is allowed to see
    ///
    /// Tools are sanitized for client consumption and deduplicated by
    /// name, keeping the first occurrence.
    pub fn available_tools(&self, can_access: impl Fn(&str) -> bool) -> Vec<Value> {
        let mut merged: IndexMap<String, Value> = IndexMap::new();

        if can_access(McpConfig::BUILTIN_SLUG) {
            for tool in builtin::descriptors() {
                if let Some(name) = tool["name"].as_str() {
                    merged.entry(name.to_string()).or_insert(tool);
                }
            }
        }

        for (slug, entry) in &self.servers {
            if !entry.routable() || !can_access(slug) {
                continue;
            }
            for tool in self.tools_for(slug) {
                let Some(name) = tool["name"].as_str() else {
                    continue;
                };
                merged
                    .entry(name.to_string())
                    .or_insert_with(|| sanitize_tool(&tool));
            }
        }

        merged.into_values().collect()
    }

    pub fn summaries(&self) -> Vec<ServerSummary> {
        self.servers
            .iter()
            .map(|(slug, entry)| ServerSummary {
                slug: slug.clone(),
                name: entry.name.clone(),
                status: entry.status,
                tool_count: self.tools_for(slug).len(),
            })
            .collect()
    }

    /// Execute a built-in tool by name
    pub async fn call_builtin(
        &self,
        tool_name: &str,
        args: &Value,
        actor_level: Option<i64>,
        engine: &RuleEngine,
    ) -> Result<Value, RegistryError> {
        let summaries = self.summaries();
        builtin::call(tool_name, args, actor_level, engine, &summaries)
            .await
            .ok_or_else(|| RegistryError::UnknownTool(tool_name.to_string()))
    }
}

/// Strip gateway-internal fields and registry noise from a tool
/// descriptor before it reaches a client
///
/// Upstream registries tend to leak `$schema` headers and
/// `additionalProperties` flags that confuse strict clients, and a
/// schema with no properties often arrives as `[]` instead of `{}`.
pub fn sanitize_tool(tool: &Value) -> Value {
    let mut tool = tool.clone();
    if let Some(obj) = tool.as_object_mut() {
        obj.remove("server");
        obj.remove("fullName");
        obj.remove("annotations");
        if let Some(schema) = obj.get_mut("inputSchema") {
            scrub_schema(schema);
        }
    }
    tool
}

fn scrub_schema(schema: &mut Value) {
    match schema {
        Value::Object(obj) => {
            obj.remove("$schema");
            obj.remove("additionalProperties");
            if let Some(props) = obj.get_mut("properties")
                && props.as_array().is_some_and(Vec::is_empty)
            {
                *props = Value::Object(serde_json::Map::new());
            }
            for value in obj.values_mut() {
                scrub_schema(value);
            }
        }
        Value::Array(items) => {
            for item in items {
                scrub_schema(item);
            }
        }
        _ => {}
    }
}
