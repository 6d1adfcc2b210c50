use std::path::Path;

use serde::{Deserialize, Serialize};

use benor_common::{BenOrError, NodeId, Result, Value};
use benor_consensus::{CoinSource, EngineConfig, QuorumPolicy, RandomCoin, TieBreak};

pub const DEFAULT_BASE_PORT: u16 = 3000;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}

fn default_true() -> bool {
    true
}

/// Everything one node needs to take part in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub node_id: NodeId,
    pub n: usize,
    pub f: usize,
    #[serde(default)]
    pub faulty: bool,
    pub initial_value: Value,

    #[serde(default = "default_host")]
    pub host: String,
    /// Node `i` listens on `base_port + i`.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Explicit peer base URLs, one per node and indexed by node id.
    /// Derived from `host` and `base_port` when empty.
    #[serde(default)]
    pub peers: Vec<String>,

    #[serde(default)]
    pub tie_break: TieBreak,
    #[serde(default = "default_true")]
    pub echo_decision: bool,
    #[serde(default = "default_true")]
    pub prune_history: bool,
    /// Seeds the node's coin (mixed with its id). Random when unset.
    #[serde(default)]
    pub coin_seed: Option<u64>,
}

impl Config {
    pub fn new(node_id: NodeId, n: usize, f: usize, initial_value: Value) -> Self {
        Self {
            node_id,
            n,
            f,
            faulty: false,
            initial_value,
            host: default_host(),
            base_port: DEFAULT_BASE_PORT,
            peers: Vec::new(),
            tie_break: TieBreak::default(),
            echo_decision: true,
            prune_history: true,
            coin_seed: None,
        }
    }

    /// One config per node of a local cluster. `initial_values` is cycled
    /// when shorter than `n`; ids listed in `faulty` are marked faulty.
    pub fn local_cluster(n: usize, f: usize, initial_values: &[Value], faulty: &[usize]) -> Vec<Self> {
        (0..n)
            .map(|i| {
                let initial = if initial_values.is_empty() {
                    Value::Zero
                } else {
                    initial_values[i % initial_values.len()]
                };
                let mut config = Self::new(NodeId(i as u32), n, f, initial);
                config.faulty = faulty.contains(&i);
                config
            })
            .collect()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Config>(&data)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        QuorumPolicy::new(self.n, self.f)?;
        if self.node_id.index() >= self.n {
            return Err(BenOrError::Config(format!("{} is outside a cluster of {} nodes", self.node_id, self.n)));
        }
        if !self.initial_value.is_binary() {
            return Err(BenOrError::InvalidInitialValue(self.initial_value));
        }
        if !self.peers.is_empty() && self.peers.len() != self.n {
            return Err(BenOrError::Config(format!("expected {} peer urls, got {}", self.n, self.peers.len())));
        }
        if self.peers.is_empty() && u16::try_from(self.n - 1).ok().and_then(|last| self.base_port.checked_add(last)).is_none() {
            return Err(BenOrError::Config(format!("base_port {} leaves no room for {} nodes", self.base_port, self.n)));
        }
        self.port()?;
        Ok(())
    }

    /// Port this node listens on: `base_port + node_id`.
    pub fn port(&self) -> Result<u16> {
        u16::try_from(self.node_id.0)
            .ok()
            .and_then(|id| self.base_port.checked_add(id))
            .ok_or_else(|| BenOrError::Config(format!("{} has no port above base_port {}", self.node_id, self.base_port)))
    }

    /// Base URL of every node, this one included, indexed by node id.
    pub fn peer_urls(&self) -> Vec<String> {
        if !self.peers.is_empty() {
            return self.peers.clone();
        }
        (0..self.n)
            .map(|i| format!("http://{}:{}", self.host, self.base_port.saturating_add(i as u16)))
            .collect()
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::new(self.node_id, self.n, self.f).faulty(self.faulty);
        engine.tie_break = self.tie_break;
        engine.echo_decision = self.echo_decision;
        engine.prune_history = self.prune_history;
        engine
    }

    pub fn coin(&self) -> Box<dyn CoinSource> {
        match self.coin_seed {
            Some(seed) => Box::new(RandomCoin::seeded(seed ^ ((self.node_id.0 as u64) << 32))),
            None => Box::new(RandomCoin::new()),
        }
    }
}
