use std::sync::Arc;

use benor_common::Result;
use benor_consensus::ConsensusEngine;
use benor_p2p::{ports::Broadcaster, HttpBroadcaster};

use crate::config::Config;

use super::{consensus_driver::ConsensusDriver, node::NodeRuntime, readiness::Readiness};

/// Validates `config` and wires a node on top of any transport.
pub fn build_runtime(
    config: &Config,
    broadcaster: Arc<dyn Broadcaster>,
    readiness: Readiness,
) -> Result<NodeRuntime> {
    config.validate()?;
    let engine = ConsensusEngine::new(config.engine_config(), config.coin())?;
    tracing::info!(
        "🔧 [{}] runtime built: n={} f={} x={} faulty={}",
        config.node_id, config.n, config.f, config.initial_value, config.faulty
    );

    let driver = ConsensusDriver::new(engine, broadcaster);
    Ok(NodeRuntime::new(driver, config.initial_value, config.faulty, readiness))
}

/// A node talking HTTP to `config.peer_urls()` that starts once every peer
/// answers `/status`.
pub fn build_http_runtime(config: &Config) -> Result<NodeRuntime> {
    let peers = config.peer_urls();
    let broadcaster = Arc::new(HttpBroadcaster::new(peers.clone())?);
    build_runtime(config, broadcaster, Readiness::ProbePeers(peers))
}
