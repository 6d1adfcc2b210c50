use tracing::{info, warn};

use benor_common::{Message, NodeId, NodeState, NodeStatus, Result, Value};

use super::{
    consensus_driver::{ConsensusDriver, StartOutcome},
    readiness::Readiness,
};

/// One node as seen by its administrative surface.
pub struct NodeRuntime {
    node_id: NodeId,
    initial_value: Value,
    faulty: bool,
    driver: ConsensusDriver,
    readiness: Readiness,
}

impl NodeRuntime {
    pub fn new(driver: ConsensusDriver, initial_value: Value, faulty: bool, readiness: Readiness) -> Self {
        Self {
            node_id: driver.node_id(),
            initial_value,
            faulty,
            driver,
            readiness,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn is_faulty(&self) -> bool {
        self.faulty
    }

    pub fn status(&self) -> NodeStatus {
        if self.faulty {
            NodeStatus::Faulty
        } else {
            NodeStatus::Live
        }
    }

    /// Waits until the cluster is ready, then enters round 1.
    /// A faulty node returns at once and never takes part.
    pub async fn start(&self) -> Result<StartOutcome> {
        if self.faulty {
            info!("💤 [{}] faulty, start ignored", self.node_id);
            return Ok(StartOutcome::Faulty);
        }
        self.readiness.wait().await?;
        let outcome = self.driver.start(self.initial_value).await?;
        if outcome != StartOutcome::Started {
            warn!("[{}] start ignored: {:?}", self.node_id, outcome);
        }
        Ok(outcome)
    }

    pub async fn stop(&self) {
        self.driver.stop().await;
    }

    pub async fn state(&self) -> NodeState {
        self.driver.state().await
    }

    pub async fn handle_message(&self, msg: Message) {
        if self.faulty {
            warn!("[{}] faulty, ignoring {}", self.node_id, msg);
            return;
        }
        self.driver.handle_message(msg).await;
    }
}
