#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Server registry: the catalog of upstream MCP servers, the built-in
//! tool set, and the shared tool cache that tool-name resolution
//! reads from.

mod builtin;
mod cache;
mod catalog;
mod error;

pub use cache::ToolCache;
pub use catalog::{ServerRegistry, ServerSummary};
pub use error::RegistryError;
