use std::{sync::Arc, time::Duration};

use clap::Parser;
use rand::Rng;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use benor_common::{NodeState, Value};
use benor_node::{
    api::rest::{serve, AppState},
    build_runtime,
    config::DEFAULT_BASE_PORT,
    logging,
    runtime::readiness::{Readiness, ReadySet},
    Config,
};
use benor_p2p::{http::DELIVERY_TIMEOUT, HttpBroadcaster};

/// Launches N HTTP nodes in one process, starts them and reports the outcome.
#[derive(Debug, Parser)]
#[command(name = "benor-cluster")]
struct Args {
    #[arg(short = 'n', long, default_value_t = 4)]
    nodes: usize,

    #[arg(short = 'f', long, default_value_t = 1)]
    faults: usize,

    /// Initial values in node order, e.g. `0,1,1,0`. Random when omitted.
    #[arg(long, value_delimiter = ',')]
    initial_values: Vec<Value>,

    /// Ids of the nodes to mark faulty.
    #[arg(long, value_delimiter = ',')]
    faulty: Vec<usize>,

    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    base_port: u16,

    #[arg(long)]
    coin_seed: Option<u64>,

    /// Seconds to wait for every live node to decide.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _guard = logging::init("cluster");

    let initial_values = if args.initial_values.is_empty() {
        let mut rng = rand::thread_rng();
        (0..args.nodes).map(|_| Value::from_bit(rng.gen_bool(0.5))).collect()
    } else {
        args.initial_values.clone()
    };

    let mut configs = Config::local_cluster(args.nodes, args.faults, &initial_values, &args.faulty);
    for config in configs.iter_mut() {
        config.base_port = args.base_port;
        config.coin_seed = args.coin_seed;
        config.validate()?;
    }

    let ready = ReadySet::new(configs.len());
    let client = reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build()?;

    for config in &configs {
        let broadcaster = Arc::new(HttpBroadcaster::with_client(client.clone(), config.peer_urls()));
        let node = Arc::new(build_runtime(config, broadcaster, Readiness::Shared(ready.clone()))?);
        let listener = TcpListener::bind((config.host.as_str(), config.port()?)).await?;

        let node_id = config.node_id;
        tokio::spawn(async move {
            if let Err(e) = serve(listener, AppState { node }).await {
                error!("REST API of {} stopped: {}", node_id, e);
            }
        });
        ready.mark_ready();
    }

    let urls = configs.first().map(Config::peer_urls).unwrap_or_default();
    info!("🚀 starting {} nodes", urls.len());
    for url in &urls {
        let client = client.clone();
        let url = format!("{url}/start");
        tokio::spawn(async move {
            if let Err(e) = client.get(&url).send().await {
                warn!("GET {} failed: {}", url, e);
            }
        });
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.timeout);
    let states = loop {
        let states = fetch_states(&client, &urls).await;
        let done = configs
            .iter()
            .zip(&states)
            .all(|(config, state)| config.faulty || state.as_ref().is_some_and(NodeState::is_decided));
        if done || tokio::time::Instant::now() >= deadline {
            break states;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    let mut decided = Vec::new();
    for (config, state) in configs.iter().zip(&states) {
        match state {
            Some(state) => {
                println!(
                    "{} x0={} faulty={} -> decided={:?} value={} round={}",
                    config.node_id,
                    config.initial_value,
                    config.faulty,
                    state.decided,
                    state.decided_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    state.round.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string()),
                );
                if let Some(v) = state.decided_value {
                    decided.push(v);
                }
            }
            None => println!("{} unreachable", config.node_id),
        }
    }

    let live = configs.iter().filter(|c| !c.faulty).count();
    if decided.len() < live {
        return Err(format!("only {}/{} live nodes decided within {}s", decided.len(), live, args.timeout).into());
    }
    if decided.windows(2).any(|w| w[0] != w[1]) {
        return Err("nodes decided different values".into());
    }
    match decided.first() {
        Some(v) => println!("✅ agreement on {}", v),
        None => println!("no live node to decide"),
    }
    Ok(())
}

async fn fetch_states(client: &reqwest::Client, urls: &[String]) -> Vec<Option<NodeState>> {
    let mut states = Vec::with_capacity(urls.len());
    for url in urls {
        let state = match client.get(format!("{url}/getState")).send().await {
            Ok(resp) => resp.json::<NodeState>().await.ok(),
            Err(_) => None,
        };
        states.push(state);
    }
    states
}
