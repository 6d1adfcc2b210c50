use async_trait::async_trait;

use benor_common::{Message, Result};

/// Outbound side of a node: delivers one message to all N nodes, the
/// sender included.
///
/// Implementations hand the message to the transport and return; they
/// never wait for peers to receive it. A failed delivery is the
/// transport's problem and is not reported back to the protocol.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, msg: Message) -> Result<()>;
}
