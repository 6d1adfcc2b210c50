use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};

use benor_common::{Message, NodeId, NodeState, Result, Value};
use benor_consensus::ConsensusEngine;
use benor_p2p::ports::Broadcaster;

/// What a call to `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    Stopped,
    /// Faulty nodes never take part.
    Faulty,
}

/// Couples an engine with a transport.
///
/// Every inbound message is applied under one lock, so a quorum is seen
/// exactly once even when handlers run concurrently. The messages the
/// engine produces are broadcast after the lock is released.
pub struct ConsensusDriver {
    node_id: NodeId,
    engine: Arc<Mutex<ConsensusEngine>>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl ConsensusDriver {
    pub fn new(engine: ConsensusEngine, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            node_id: engine.node_id(),
            engine: Arc::new(Mutex::new(engine)),
            broadcaster,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub async fn start(&self, initial: Value) -> Result<StartOutcome> {
        let outbound = {
            let mut engine = self.engine.lock().await;
            if engine.is_faulty() {
                return Ok(StartOutcome::Faulty);
            }
            if engine.is_stopped() {
                return Ok(StartOutcome::Stopped);
            }
            if engine.state().round.is_some() {
                return Ok(StartOutcome::AlreadyRunning);
            }
            engine.start(initial)?
        };
        self.dispatch(outbound).await;
        Ok(StartOutcome::Started)
    }

    pub async fn handle_message(&self, msg: Message) {
        let outbound = {
            let mut engine = self.engine.lock().await;
            engine.handle_message(msg)
        };
        self.dispatch(outbound).await;
    }

    pub async fn stop(&self) {
        self.engine.lock().await.stop();
    }

    pub async fn state(&self) -> NodeState {
        self.engine.lock().await.state()
    }

    async fn dispatch(&self, outbound: Vec<Message>) {
        for msg in outbound {
            debug!("📤 [{}] broadcasting {}", self.node_id, msg);
            tracing::info!(target: "consensus", "EVENT:SEND node={} k={} phase={} x={}", self.node_id, msg.round, msg.phase, msg.value);
            if let Err(e) = self.broadcaster.broadcast(msg).await {
                error!("[{}] failed to broadcast {}: {}", self.node_id, msg, e);
            }
        }
    }
}
