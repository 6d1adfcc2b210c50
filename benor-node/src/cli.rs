use std::path::Path;

use clap::Parser;

use benor_common::{BenOrError, NodeId, Result, Value};

use crate::config::Config;

/// Runs one Ben-Or node behind an HTTP API.
#[derive(Debug, Clone, Parser)]
#[command(name = "benor-node", version)]
pub struct Args {
    /// Config file. Loaded when it exists; flags below override its fields.
    #[arg(long, default_value = "config.json")]
    pub config: String,

    #[arg(long)]
    pub node_id: Option<u32>,

    /// Cluster size N.
    #[arg(short = 'n', long)]
    pub nodes: Option<usize>,

    /// Tolerated faulty nodes F.
    #[arg(short = 'f', long)]
    pub faults: Option<usize>,

    /// Initial value: 0 or 1.
    #[arg(long)]
    pub initial_value: Option<Value>,

    #[arg(long)]
    pub faulty: bool,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub base_port: Option<u16>,

    /// Peer base URL; repeat once per node, in node id order.
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    #[arg(long)]
    pub coin_seed: Option<u64>,

    /// Start consensus as soon as every peer answers `/status`.
    #[arg(long)]
    pub auto_start: bool,

    /// Write the resulting config back to `--config` and exit.
    #[arg(long)]
    pub save: bool,
}

impl Args {
    /// Loads `--config` if present, applies the flags and validates the result.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = if Path::new(&self.config).exists() {
            Config::load_from_file(&self.config)?
        } else {
            let node_id = self.node_id.ok_or_else(|| missing("--node-id"))?;
            let n = self.nodes.ok_or_else(|| missing("--nodes"))?;
            let f = self.faults.ok_or_else(|| missing("--faults"))?;
            let initial = self.initial_value.ok_or_else(|| missing("--initial-value"))?;
            Config::new(NodeId(node_id), n, f, initial)
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(id) = self.node_id {
            config.node_id = NodeId(id);
        }
        if let Some(n) = self.nodes {
            config.n = n;
        }
        if let Some(f) = self.faults {
            config.f = f;
        }
        if let Some(v) = self.initial_value {
            config.initial_value = v;
        }
        if self.faulty {
            config.faulty = true;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }
        if !self.peers.is_empty() {
            config.peers = self.peers.clone();
        }
        if let Some(seed) = self.coin_seed {
            config.coin_seed = Some(seed);
        }
    }
}

fn missing(flag: &str) -> BenOrError {
    BenOrError::Config(format!("no config file found and {flag} not given"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config_without_file() {
        let args = Args::parse_from([
            "benor-node", "--config", "/nonexistent/benor.json",
            "--node-id", "2", "-n", "4", "-f", "1", "--initial-value", "1", "--faulty",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.node_id, NodeId(2));
        assert_eq!(config.initial_value, Value::One);
        assert!(config.faulty);
        assert_eq!(config.port().unwrap(), 3002);
    }

    #[test]
    fn test_missing_flags_are_reported() {
        let args = Args::parse_from(["benor-node", "--config", "/nonexistent/benor.json", "-n", "4"]);
        assert!(matches!(args.resolve_config(), Err(BenOrError::Config(_))));
    }

    #[test]
    fn test_abstain_is_rejected_as_initial_value() {
        let args = Args::parse_from([
            "benor-node", "--config", "/nonexistent/benor.json",
            "--node-id", "0", "-n", "3", "-f", "1", "--initial-value", "?",
        ]);
        assert!(matches!(args.resolve_config(), Err(BenOrError::InvalidInitialValue(Value::Abstain))));
    }
}
