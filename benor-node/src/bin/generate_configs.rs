use std::path::PathBuf;

use clap::Parser;
use rand::Rng;

use benor_common::Value;
use benor_node::{config::DEFAULT_BASE_PORT, Config};

/// Writes `<out>/node-<i>/config.json` for every node of a local cluster.
#[derive(Debug, Parser)]
#[command(name = "generate_configs")]
struct Args {
    #[arg(short = 'n', long, default_value_t = 4)]
    nodes: usize,

    #[arg(short = 'f', long, default_value_t = 1)]
    faults: usize,

    /// Initial values in node order, e.g. `0,1,1,0`. Random when omitted.
    #[arg(long, value_delimiter = ',')]
    initial_values: Vec<Value>,

    /// Ids of the nodes to mark faulty, e.g. `3`.
    #[arg(long, value_delimiter = ',')]
    faulty: Vec<usize>,

    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    base_port: u16,

    #[arg(long)]
    coin_seed: Option<u64>,

    #[arg(long, default_value = "cluster")]
    out: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let initial_values = if args.initial_values.is_empty() {
        let mut rng = rand::thread_rng();
        (0..args.nodes).map(|_| Value::from_bit(rng.gen_bool(0.5))).collect()
    } else {
        args.initial_values.clone()
    };

    for mut config in Config::local_cluster(args.nodes, args.faults, &initial_values, &args.faulty) {
        config.base_port = args.base_port;
        config.coin_seed = args.coin_seed;
        config.validate()?;

        let path = args.out.join(config.node_id.to_string()).join("config.json");
        config.save_to_file(&path)?;
        println!(
            "{} -> {} (port {}, x={}{})",
            config.node_id,
            path.display(),
            config.port()?,
            config.initial_value,
            if config.faulty { ", faulty" } else { "" }
        );
    }
    Ok(())
}
