#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Upstream MCP proxying
//!
//! Talks JSON-RPC over HTTP to registered upstream servers, holds one
//! initialized upstream session per caller and server, and keeps the
//! shared tool cache warm.

mod client;
mod error;
mod manager;

pub use client::UpstreamClient;
pub use error::ProxyError;
pub use manager::{ConnectionManager, SessionView};
