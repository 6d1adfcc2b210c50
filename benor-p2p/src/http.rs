use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use benor_common::{BenOrError, Message, Result};

use crate::ports::Broadcaster;

/// Upper bound on one delivery, so a peer that accepts the connection and
/// never answers cannot pin a task forever.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcasts by POSTing the JSON message to `{peer}/message` on every peer.
#[derive(Debug, Clone)]
pub struct HttpBroadcaster {
    client: reqwest::Client,
    peers: Vec<String>,
}

impl HttpBroadcaster {
    /// `peers` are base URLs such as `http://127.0.0.1:3000`, one per node.
    pub fn new(peers: Vec<String>) -> Result<Self> {
        Self::with_timeout(peers, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(peers: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BenOrError::Network(e.to_string()))?;
        Ok(Self::with_client(client, peers))
    }

    /// Uses `client` as is; its timeout settings apply to every delivery.
    pub fn with_client(client: reqwest::Client, peers: Vec<String>) -> Self {
        let peers = peers
            .into_iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .collect();
        Self { client, peers }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }
}

async fn deliver(client: &reqwest::Client, url: &str, body: String) -> Result<()> {
    let resp = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| BenOrError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(BenOrError::Network(format!("answered {}", resp.status())));
    }
    Ok(())
}

#[async_trait]
impl Broadcaster for HttpBroadcaster {
    async fn broadcast(&self, msg: Message) -> Result<()> {
        let body = msg.to_json().map_err(|e| BenOrError::Broadcast(e.to_string()))?;

        for peer in &self.peers {
            let client = self.client.clone();
            let url = format!("{peer}/message");
            let body = body.clone();
            tokio::spawn(async move {
                if let Err(e) = deliver(&client, &url, body).await {
                    debug!("broadcast to {} failed: {}", url, e);
                }
            });
        }
        Ok(())
    }
}
