use std::path::PathBuf;

use clap::Parser;

/// Gatehouse MCP gateway
#[derive(Debug, Parser)]
#[command(name = "gatehouse", about = "MCP gateway with a security sandbox rule engine")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gatehouse.toml", env = "GATEHOUSE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "GATEHOUSE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
