use clap::Parser;
use ledger_core::node::Node;
use ledger_node::{router, spawn_resolver, Args, HttpPeers};
use std::{net::SocketAddr, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.node_config()?;
    info!(node_id = %config.node_id, difficulty = config.pow.difficulty(), "starting node");

    let node = Node::new(config, HttpPeers::new(args.fetch_timeout())?);
    if !args.peers.is_empty() {
        let peers = node.register_nodes(args.peers.as_slice()).await?;
        info!(?peers, "registered startup peers");
    }

    if let Some(secs) = args.resolve_interval_secs {
        spawn_resolver(node.clone(), Duration::from_secs(secs.max(1)));
    }

    let app = router(node);
    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
