//! In-process cluster over a `MemoryBus`.
//!
//! Each node gets its own inbox task, and every message pulled from an inbox
//! is handled on a freshly spawned task, so handlers of one node really do
//! race for the engine lock the way concurrent HTTP requests would.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::info;

use benor_common::{BenOrError, NodeState, Result};
use benor_p2p::{MemoryBroadcaster, MemoryBus};

use crate::{
    config::Config,
    runtime::{builder::build_runtime, node::NodeRuntime, readiness::{Readiness, ReadySet}},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct LocalCluster {
    nodes: Vec<Arc<NodeRuntime>>,
    inbox_tasks: Vec<JoinHandle<()>>,
}

impl LocalCluster {
    /// Builds one runtime per config (configs are indexed by node id) and
    /// attaches them to a fresh bus delaying each delivery by up to `jitter`.
    pub async fn launch(configs: &[Config], jitter: Duration) -> Result<Self> {
        let n = configs.len();
        let (bus, inboxes) = MemoryBus::new(n, jitter);
        let ready = ReadySet::new(n);

        let mut nodes = Vec::with_capacity(n);
        let mut inbox_tasks = Vec::with_capacity(n);

        for (i, (config, mut inbox)) in configs.iter().zip(inboxes).enumerate() {
            if config.node_id.index() != i || config.n != n {
                return Err(BenOrError::Config(format!(
                    "config #{i} is {} of {} nodes, expected node-{i} of {n}",
                    config.node_id, config.n
                )));
            }
            let broadcaster = Arc::new(MemoryBroadcaster::new(config.node_id, bus.clone()));
            let node = Arc::new(build_runtime(config, broadcaster, Readiness::Shared(ready.clone()))?);

            let handler = node.clone();
            inbox_tasks.push(tokio::spawn(async move {
                while let Some(msg) = inbox.recv().await {
                    let node = handler.clone();
                    tokio::spawn(async move { node.handle_message(msg).await });
                }
            }));

            ready.mark_ready();
            nodes.push(node);
        }

        info!("🧪 local cluster of {} nodes launched (jitter {:?})", n, jitter);
        Ok(Self { nodes, inbox_tasks })
    }

    pub fn nodes(&self) -> &[Arc<NodeRuntime>] {
        &self.nodes
    }

    pub async fn start_all(&self) -> Result<()> {
        let results = join_all(self.nodes.iter().map(|node| node.start())).await;
        results.into_iter().try_for_each(|res| res.map(|_| ()))
    }

    pub async fn stop_all(&self) {
        join_all(self.nodes.iter().map(|node| node.stop())).await;
    }

    pub async fn states(&self) -> Vec<NodeState> {
        join_all(self.nodes.iter().map(|node| node.state())).await
    }

    /// Polls until every non-faulty node has decided, then returns all states.
    pub async fn wait_for_decisions(&self, timeout: Duration) -> Result<Vec<NodeState>> {
        let poll = async {
            loop {
                let states = self.states().await;
                let done = self
                    .nodes
                    .iter()
                    .zip(&states)
                    .all(|(node, state)| node.is_faulty() || state.is_decided());
                if done {
                    return states;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BenOrError::Other(format!("cluster did not decide within {timeout:?}")))
    }
}

impl Drop for LocalCluster {
    fn drop(&mut self) {
        for task in &self.inbox_tasks {
            task.abort();
        }
    }
}
