use ledger_core::consensus::PeerFetch;
use ledger_core::node::Node;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Run conflict resolution against the registered peers every `every`, for
/// as long as the returned task lives.
pub fn spawn_resolver<F: PeerFetch>(node: Node<F>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        loop {
            interval.tick().await;
            if node.resolve_conflicts().await {
                let length = node.len().await;
                info!(length, "chain replaced by a peer chain");
            }
        }
    })
}
