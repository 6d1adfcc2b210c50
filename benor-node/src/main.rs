use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use benor_node::{
    api::rest::{serve, AppState},
    build_http_runtime,
    cli::Args,
    logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    if args.save {
        config.save_to_file(&args.config)?;
        println!("config for {} written to {}", config.node_id, args.config);
        return Ok(());
    }

    let _guard = logging::init(&config.node_id.to_string());

    info!("--- starting Ben-Or {} ---", config.node_id);
    info!("Config: n={} f={} x={} faulty={}", config.n, config.f, config.initial_value, config.faulty);
    info!("Peers: {:?}", config.peer_urls());

    let node = Arc::new(build_http_runtime(&config)?);
    let listener = TcpListener::bind((config.host.as_str(), config.port()?)).await?;

    if args.auto_start {
        let node = node.clone();
        tokio::spawn(async move {
            match node.start().await {
                Ok(outcome) => info!("start: {:?}", outcome),
                Err(e) => error!("failed to start consensus: {}", e),
            }
        });
    }

    if let Err(e) = serve(listener, AppState { node }).await {
        error!("REST API stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
