use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;

use benor_common::{BenOrError, Message, NodeId, Result};

use crate::ports::Broadcaster;

/// In-process network: one unbounded inbox per node.
///
/// With a non-zero jitter every delivery is delayed by a random amount up
/// to `max_jitter`, so messages overtake each other the way they would on
/// a real network.
pub struct MemoryBus {
    inboxes: Vec<mpsc::UnboundedSender<Message>>,
    max_jitter: Duration,
}

impl fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBus")
            .field("nodes", &self.inboxes.len())
            .field("max_jitter", &self.max_jitter)
            .finish()
    }
}

impl MemoryBus {
    /// Creates a bus for `n` nodes and returns the receiving end of each inbox,
    /// indexed by node id.
    pub fn new(n: usize, max_jitter: Duration) -> (Arc<Self>, Vec<mpsc::UnboundedReceiver<Message>>) {
        let (inboxes, receivers) = (0..n).map(|_| mpsc::unbounded_channel()).unzip();
        (Arc::new(Self { inboxes, max_jitter }), receivers)
    }

    pub fn send_to(&self, target: NodeId, msg: Message) -> Result<()> {
        let inbox = self
            .inboxes
            .get(target.index())
            .ok_or_else(|| BenOrError::Broadcast(format!("unknown node {target}")))?;

        if self.max_jitter.is_zero() {
            return inbox
                .send(msg)
                .map_err(|_| BenOrError::Broadcast(format!("{target} inbox closed")));
        }

        let max_micros = self.max_jitter.as_micros().min(u64::MAX as u128) as u64;
        let delay = Duration::from_micros(rand::thread_rng().gen_range(0..=max_micros));
        let inbox = inbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inbox.send(msg).is_err() {
                debug!("{} inbox closed, message dropped", target);
            }
        });
        Ok(())
    }

    pub fn broadcast(&self, msg: Message) -> Result<()> {
        for id in 0..self.inboxes.len() {
            let target = NodeId(id as u32);
            if let Err(e) = self.send_to(target, msg) {
                debug!("delivery to {} failed: {}", target, e);
            }
        }
        Ok(())
    }
}

/// `Broadcaster` for one node attached to a `MemoryBus`.
#[derive(Debug, Clone)]
pub struct MemoryBroadcaster {
    pub node_id: NodeId,
    bus: Arc<MemoryBus>,
}

impl MemoryBroadcaster {
    pub fn new(node_id: NodeId, bus: Arc<MemoryBus>) -> Self {
        Self { node_id, bus }
    }
}

#[async_trait]
impl Broadcaster for MemoryBroadcaster {
    async fn broadcast(&self, msg: Message) -> Result<()> {
        debug!("📤 [{}] broadcasting {}", self.node_id, msg);
        self.bus.broadcast(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benor_common::Value;

    #[tokio::test]
    async fn test_broadcast_reaches_every_node_including_sender() {
        let (bus, mut inboxes) = MemoryBus::new(3, Duration::ZERO);
        let sender = MemoryBroadcaster::new(NodeId(1), bus);

        sender.broadcast(Message::vote(2, Value::Abstain)).await.unwrap();

        for inbox in inboxes.iter_mut() {
            assert_eq!(inbox.recv().await, Some(Message::vote(2, Value::Abstain)));
        }
    }

    #[tokio::test]
    async fn test_jittered_delivery_still_arrives() {
        let (bus, mut inboxes) = MemoryBus::new(2, Duration::from_millis(5));
        for round in 1..=10 {
            bus.broadcast(Message::proposal(round, Value::Zero)).unwrap();
        }

        let mut rounds = Vec::new();
        for _ in 0..10 {
            rounds.push(inboxes[0].recv().await.unwrap().round);
        }
        rounds.sort_unstable();
        assert_eq!(rounds, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let (bus, _inboxes) = MemoryBus::new(2, Duration::ZERO);
        assert!(bus.send_to(NodeId(5), Message::proposal(1, Value::One)).is_err());
    }
}
