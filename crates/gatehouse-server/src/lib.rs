#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! HTTP surface of the gateway: the MCP protocol route, the
//! management endpoints, the security dry-run endpoint, and the
//! periodic session sweep.

mod admin;
mod framing;
mod health;
mod mcp;
mod protocol;
mod security;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use gatehouse_config::Config;

pub use state::GatewayState;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Spawns the session sweep and usage-log flusher, so this must
    /// run inside a tokio runtime.
    pub fn new(config: &Config) -> Self {
        let state = GatewayState::new(config);

        spawn_session_sweep(Arc::clone(&state), Duration::from_secs(config.mcp.cleanup_interval));

        let mut app = Router::new()
            .route(
                "/mcp/message",
                post(mcp::post_message)
                    .get(mcp::get_stream)
                    .options(mcp::preflight),
            )
            .route("/mcp/proxy", post(admin::legacy_proxy).options(mcp::preflight))
            .route("/mcp/tools", get(admin::list_tools).options(mcp::preflight))
            .route("/mcp/sessions", get(admin::list_sessions))
            .route("/security/check", post(security::check));

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, get(health::health));
        }

        let router = app.with_state(state).layer(TraceLayer::new_for_http());

        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 9501)));

        Self {
            router,
            listen_address,
        }
    }

    /// Get the configured listen address
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "gatehouse listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

/// Reap idle upstream sessions on a fixed interval
fn spawn_session_sweep(state: Arc<GatewayState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = state.manager.cleanup_expired_sessions();
            if removed > 0 {
                tracing::info!(removed, "expired idle MCP sessions");
            }
        }
    });
}
