//! Relay server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use uno_net::relay::{run_relay, RelayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    info!("starting uno relay...");

    let state = Arc::new(RelayState::new());
    run_relay(addr, state).await
}
