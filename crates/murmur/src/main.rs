//! murmur-node: a gossip broadcast node speaking line-delimited JSON on
//! stdin/stdout.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use murmur::{Node, NodeConfig, StdioTransport, Transport};

#[derive(Parser, Debug)]
#[command(name = "murmur-node")]
#[command(about = "Gossip broadcast node over stdin/stdout")]
struct Args {
    /// Milliseconds between full-state gossip rounds
    #[arg(long, default_value_t = 200)]
    gossip_period_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

impl Args {
    fn config(&self) -> NodeConfig {
        NodeConfig::default().with_gossip_period(Duration::from_millis(self.gossip_period_ms))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the protocol; logs go to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = args.config();
    config.validate().context("invalid configuration")?;

    let transport = StdioTransport::connect()
        .await
        .context("waiting for init")?;
    info!(node = %transport.local_node_id(), period = ?config.gossip.period, "ready");

    Node::new(transport, config)?.run().await?;
    Ok(())
}
