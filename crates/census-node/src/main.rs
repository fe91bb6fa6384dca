//! Census node binary
//!
//! Runs a census node against a local simulated cluster. Ctrl-C performs a
//! graceful leave before exiting.

use std::sync::Arc;

use census_control::ParticipationState;
use census_model::LeaveReason;
use census_node::{CensusNode, LocalCluster, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> census_node::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "census_node=info,census=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NodeConfig::from_env()?;
    tracing::info!(?config, "Starting census node");

    let mut cluster = LocalCluster::new(&config);
    let population = cluster.genesis_population()?;
    let local = cluster.local_peer();
    let node = Arc::new(CensusNode::start(
        config.clone(),
        local.profile,
        local.crypto,
        cluster.current_pulse(),
        population,
    ));

    let driver = {
        let node = node.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(node.config().pulse_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                match cluster.step(&node) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!("pulse numbers exhausted");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("pulse failed: {}", e);
                        break;
                    }
                }
                if node.participation() == ParticipationState::Left {
                    break;
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    let left = node.leave_gracefully(LeaveReason(0)).await;
    driver.abort();
    left?;

    tracing::info!("Census node stopped");
    Ok(())
}
