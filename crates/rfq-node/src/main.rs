//! # PhotonX Coordinator Node
//!
//! The main entry point for the off-chain RFQ channel coordinator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 rfq-node (this binary)            │
//! ├─────────────────────────────────────────────────┤
//! │  NodeContainer: store · state machine · pipeline  │
//! │                 · settlement driver · event bus   │
//! │         │                              │           │
//! │         ▼                              ▼           │
//! │  GatewayService (REST + /ws)    TimerWheel         │
//! │                                  (mark_timed_out)   │
//! └─────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rfq_node::container::{NodeConfig, NodeContainer};
use rfq_node::timer::TimerWheel;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("===========================================");
    info!("  PhotonX Channel Coordinator");
    info!("===========================================");

    let config = NodeConfig::from_env();
    config.validate()?;

    let container = NodeContainer::new(config.clone());

    let wheel = TimerWheel::new(
        container.machine.clone(),
        container.store.clone(),
        Duration::from_millis(config.timer.sweep_interval_ms),
    );
    wheel.spawn();
    info!(interval_ms = config.timer.sweep_interval_ms, "timer wheel started");

    let gateway_state = container.gateway_state();
    let mut gateway = rfq_gateway::GatewayService::new(config.gateway.clone(), gateway_state)?;

    info!(addr = %config.gateway.http_addr(), "starting operator gateway");

    tokio::select! {
        result = gateway.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down gateway");
            gateway.shutdown();
        }
    }

    info!("coordinator node stopped");
    Ok(())
}
