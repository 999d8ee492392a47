use clap::Parser;
use ledger_core::constants::{
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_FETCHES, POW_TARGET_DIFFICULTY,
};
use ledger_core::consensus::ResolverConfig;
use ledger_core::node::NodeConfig;
use ledger_core::pow::ProofOfWork;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: String,

    /// Identifier credited with mining rewards (random when omitted)
    #[arg(long)]
    pub node_id: Option<String>,

    /// Leading zero hex digits required of each proof
    #[arg(long, default_value_t = POW_TARGET_DIFFICULTY)]
    pub difficulty: usize,

    /// Peer to register at startup; may be repeated
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    /// Per-peer timeout when fetching chains
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_MS)]
    pub fetch_timeout_ms: u64,

    /// Peer chains fetched at once during conflict resolution
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_FETCHES)]
    pub max_concurrent_fetches: usize,

    /// Resolve conflicts in the background every N seconds
    #[arg(long)]
    pub resolve_interval_secs: Option<u64>,
}

impl Args {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn node_config(&self) -> anyhow::Result<NodeConfig> {
        Ok(NodeConfig {
            node_id: self.node_id.clone().unwrap_or_else(random_node_id),
            pow: ProofOfWork::new(self.difficulty)?,
            resolver: ResolverConfig {
                fetch_timeout: self.fetch_timeout(),
                max_concurrent_fetches: self.max_concurrent_fetches,
            },
        })
    }
}

/// 128 random bits, hex encoded.
pub fn random_node_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["ledger-node"]);
        assert_eq!(args.listen, "127.0.0.1:5000");
        assert_eq!(args.difficulty, POW_TARGET_DIFFICULTY);
        assert!(args.peers.is_empty());
        assert_eq!(args.resolve_interval_secs, None);

        let config = args.node_config().unwrap();
        assert_eq!(config.node_id.len(), 32);
        assert_eq!(config.pow.difficulty(), POW_TARGET_DIFFICULTY);
        assert_eq!(
            config.resolver.fetch_timeout,
            Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS)
        );
    }

    #[test]
    fn explicit_flags() {
        let args = Args::parse_from([
            "ledger-node",
            "--listen",
            "0.0.0.0:5001",
            "--node-id",
            "miner-1",
            "--difficulty",
            "3",
            "--peer",
            "http://127.0.0.1:5000",
            "--peer",
            "127.0.0.1:5002",
            "--fetch-timeout-ms",
            "250",
            "--max-concurrent-fetches",
            "4",
            "--resolve-interval-secs",
            "10",
        ]);
        assert_eq!(args.peers.len(), 2);
        assert_eq!(args.resolve_interval_secs, Some(10));

        let config = args.node_config().unwrap();
        assert_eq!(config.node_id, "miner-1");
        assert_eq!(config.pow.difficulty(), 3);
        assert_eq!(config.resolver.fetch_timeout, Duration::from_millis(250));
        assert_eq!(config.resolver.max_concurrent_fetches, 4);
    }

    #[test]
    fn impossible_difficulty_is_rejected() {
        let args = Args::parse_from(["ledger-node", "--difficulty", "65"]);
        assert!(args.node_config().is_err());
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(random_node_id(), random_node_id());
    }
}
