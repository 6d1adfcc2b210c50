use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::Notify;
use tracing::{debug, info};

use benor_common::{BenOrError, Result};

const PROBE_INTERVAL: Duration = Duration::from_millis(50);
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Counter shared by nodes living in one process. Each node marks itself
/// ready once it can receive messages.
#[derive(Debug, Clone)]
pub struct ReadySet {
    ready: Arc<AtomicUsize>,
    expected: usize,
    notify: Arc<Notify>,
}

impl ReadySet {
    pub fn new(expected: usize) -> Self {
        Self {
            ready: Arc::new(AtomicUsize::new(0)),
            expected,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) >= self.expected
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}

/// What a node waits for before entering round 1.
#[derive(Debug, Clone)]
pub enum Readiness {
    Immediate,
    Shared(ReadySet),
    /// Poll `GET {url}/status` until every peer answers, whatever the status
    /// code: a faulty peer answering 500 is still up.
    ProbePeers(Vec<String>),
}

impl Readiness {
    pub async fn wait(&self) -> Result<()> {
        match self {
            Readiness::Immediate => {}
            Readiness::Shared(set) => set.wait().await,
            Readiness::ProbePeers(urls) => probe_peers(urls).await?,
        }
        Ok(())
    }
}

async fn probe_peers(urls: &[String]) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| BenOrError::Network(e.to_string()))?;
    let mut pending: Vec<&String> = urls.iter().collect();

    while !pending.is_empty() {
        let mut still_pending = Vec::with_capacity(pending.len());
        for url in pending {
            if !probe_once(&client, url).await {
                still_pending.push(url);
            }
        }
        pending = still_pending;
        if !pending.is_empty() {
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }
    info!("✅ all {} peers are reachable", urls.len());
    Ok(())
}

/// True once `url` answers `/status` with any HTTP response.
async fn probe_once(client: &reqwest::Client, url: &str) -> bool {
    match client.get(format!("{url}/status")).send().await {
        Ok(_) => true,
        Err(e) => {
            debug!("peer {} not ready: {}", url, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_set_releases_waiters_once_full() {
        let set = ReadySet::new(2);
        let waiter = tokio::spawn({
            let set = set.clone();
            async move { set.wait().await }
        });

        set.mark_ready();
        assert!(!set.is_ready());
        set.mark_ready();

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(set.is_ready());
    }

    #[tokio::test]
    async fn test_immediate_does_not_block() {
        tokio::time::timeout(Duration::from_millis(100), Readiness::Immediate.wait())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_probe_gives_up_on_silent_peer() {
        // accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = reqwest::Client::builder().timeout(Duration::from_millis(100)).build().unwrap();
        let answered = tokio::time::timeout(Duration::from_secs(5), probe_once(&client, &url))
            .await
            .expect("probe hung past its timeout");
        assert!(!answered);
    }
}
