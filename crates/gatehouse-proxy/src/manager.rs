use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use jiff::Timestamp;
use serde::Serialize;

use gatehouse_config::{McpConfig, UpstreamServerConfig};
use gatehouse_registry::ToolCache;

use crate::client::UpstreamClient;
use crate::error::ProxyError;

/// Per-session bookkeeping, reported by the sessions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    /// `{api_key_id}:{server_slug}`
    pub session_key: String,
    pub server_slug: String,
    pub created_at: Timestamp,
    pub last_used: Timestamp,
    pub request_count: u64,
}

struct SessionInfo {
    server_slug: String,
    created_at: Timestamp,
    last_used: Timestamp,
    request_count: u64,
}

/// Manages upstream connections and their sessions
///
/// One upstream client per caller and server, keyed
/// `{api_key_id}:{server_slug}`, so clearing a caller's session drops
/// their upstream connection without touching anyone else's. Idle
/// sessions are swept on an interval the binary drives.
pub struct ConnectionManager {
    servers: IndexMap<String, UpstreamServerConfig>,
    clients: DashMap<String, Arc<UpstreamClient>>,
    sessions: DashMap<String, SessionInfo>,
    tool_cache: Arc<ToolCache>,
    idle_ttl: Duration,
    call_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(config: &McpConfig, tool_cache: Arc<ToolCache>) -> Self {
        Self {
            servers: config.servers.clone(),
            clients: DashMap::new(),
            sessions: DashMap::new(),
            tool_cache,
            idle_ttl: Duration::from_secs(config.session_idle_ttl),
            call_timeout: Duration::from_secs(config.call_timeout),
        }
    }

    /// Call a tool on an upstream server for the given API key
    ///
    /// Reuses the caller's upstream session when one exists. The call
    /// runs under the configured deadline; a transport failure evicts
    /// the client so the next call starts a fresh handshake.
    pub async fn call_tool(
        &self,
        api_key_id: i64,
        slug: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ProxyError> {
        let key = session_key(api_key_id, slug);
        let client = self.client_for(&key, slug)?;

        let seconds = self.call_timeout.as_secs();
        let result = tokio::time::timeout(self.call_timeout, client.call_tool(tool, arguments))
            .await
            .map_err(|_| ProxyError::Timeout { seconds })?;

        match result {
            Ok(value) => {
                self.touch_session(&key, slug);
                Ok(value)
            }
            Err(e) => {
                if matches!(e, ProxyError::Transport(_) | ProxyError::Handshake { .. }) {
                    self.clients.remove(&key);
                }
                Err(e)
            }
        }
    }

    /// Tools for a server, refreshing the shared cache when its entry
    /// has aged out
    ///
    /// A failed refresh logs and keeps serving the stale list.
    pub async fn fresh_tools(&self, slug: &str) -> Option<Vec<serde_json::Value>> {
        if !self.tool_cache.is_fresh(slug) {
            match self.fetch_tools(slug).await {
                Ok(tools) => self.tool_cache.store(slug, tools),
                Err(e) => {
                    tracing::warn!(server = slug, error = %e, "tool refresh failed, keeping cached list");
                }
            }
        }
        self.tool_cache.get(slug)
    }

    /// Refresh every registered server's tool list
    pub async fn refresh_all_tools(&self) {
        for slug in self.servers.keys() {
            let _ = self.fresh_tools(slug).await;
        }
    }

    async fn fetch_tools(&self, slug: &str) -> Result<Vec<serde_json::Value>, ProxyError> {
        // The listing connection is shared across callers, not tied
        // to any API key.
        let key = format!("tools:{slug}");
        let client = self.client_for(&key, slug)?;
        client.list_tools().await
    }

    fn client_for(&self, key: &str, slug: &str) -> Result<Arc<UpstreamClient>, ProxyError> {
        if let Some(client) = self.clients.get(key) {
            return Ok(Arc::clone(&client));
        }

        let config = self
            .servers
            .get(slug)
            .ok_or_else(|| ProxyError::Transport(format!("server not registered: {slug}")))?;
        let client = Arc::new(UpstreamClient::new(slug, config, self.call_timeout)?);
        self.clients.insert(key.to_string(), Arc::clone(&client));
        Ok(client)
    }

    fn touch_session(&self, key: &str, slug: &str) {
        let now = Timestamp::now();
        let mut entry = self.sessions.entry(key.to_string()).or_insert_with(|| SessionInfo {
            server_slug: slug.to_string(),
            created_at: now,
            last_used: now,
            request_count: 0,
        });
        entry.last_used = now;
        entry.request_count += 1;
    }

    /// Snapshot of live sessions
    pub fn sessions(&self) -> Vec<SessionView> {
        self.sessions
            .iter()
            .map(|entry| SessionView {
                session_key: entry.key().clone(),
                server_slug: entry.server_slug.clone(),
                created_at: entry.created_at,
                last_used: entry.last_used,
                request_count: entry.request_count,
            })
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a caller's session and its upstream connection
    pub fn clear_session(&self, api_key_id: i64, slug: &str) {
        let key = session_key(api_key_id, slug);
        self.clients.remove(&key);
        self.sessions.remove(&key);
    }

    /// Sweep sessions idle past the TTL, returning how many went
    pub fn cleanup_expired_sessions(&self) -> usize {
        let cutoff = Timestamp::now().as_second() - i64::try_from(self.idle_ttl.as_secs()).unwrap_or(i64::MAX);

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.last_used.as_second() < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            self.clients.remove(key);
            self.sessions.remove(key);
            tracing::debug!(session = %key, "expired idle session");
        }
        expired.len()
    }
}

fn session_key(api_key_id: i64, slug: &str) -> String {
    format!("{api_key_id}:{slug}")
}

#[cfg(test)]
mod tests {
    use jiff::ToSpan as _;

    use super::*;

    fn manager(idle_ttl: u64) -> ConnectionManager {
        let config = McpConfig {
            session_idle_ttl: idle_ttl,
            ..McpConfig::default()
        };
        ConnectionManager::new(&config, Arc::new(ToolCache::new(Duration::from_secs(300))))
    }

    #[test]
    fn session_keys_pair_key_and_server() {
        assert_eq!(session_key(42, "filesys"), "42:filesys");
    }

    #[test]
    fn touch_creates_then_accumulates() {
        let m = manager(1800);
        m.touch_session("42:filesys", "filesys");
        m.touch_session("42:filesys", "filesys");
        m.touch_session("7:search", "search");

        assert_eq!(m.session_count(), 2);
        let sessions = m.sessions();
        let filesys = sessions.iter().find(|s| s.session_key == "42:filesys").unwrap();
        assert_eq!(filesys.request_count, 2);
        assert_eq!(filesys.server_slug, "filesys");
    }

    #[test]
    fn cleanup_removes_only_idle_sessions() {
        let m = manager(1800);
        m.touch_session("42:filesys", "filesys");
        m.touch_session("7:search", "search");

        // Age one session past the TTL
        m.sessions.get_mut("42:filesys").unwrap().last_used = Timestamp::now() - 3600.seconds();

        assert_eq!(m.cleanup_expired_sessions(), 1);
        assert_eq!(m.session_count(), 1);
        assert!(m.sessions.get("7:search").is_some());
    }

    #[test]
    fn clear_session_is_scoped_to_one_caller() {
        let m = manager(1800);
        m.touch_session("42:filesys", "filesys");
        m.touch_session("7:filesys", "filesys");

        m.clear_session(42, "filesys");

        assert_eq!(m.session_count(), 1);
        assert!(m.sessions.get("7:filesys").is_some());
    }
}
