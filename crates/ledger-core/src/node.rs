//! A running ledger replica: one lock over the ledger and its peer set, with
//! proof search and peer fetches kept outside of it.

use crate::chain::Ledger;
use crate::consensus::{self, PeerFetch, Resolver, ResolverConfig};
use crate::error::{LedgerError, Result};
use crate::mine::{self, CancelFlag};
use crate::nodes::{network_location, NodeRegistry};
use crate::pow::ProofOfWork;
use crate::{Block, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub node_id: String,
    pub pow: ProofOfWork,
    pub resolver: ResolverConfig,
}

impl NodeConfig {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            pow: ProofOfWork::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Forged(Block),
    /// The search was abandoned because the chain was replaced.
    Cancelled,
    /// The tip moved while searching; the proof no longer applies.
    Stale,
}

struct NodeState {
    ledger: Ledger,
    registry: NodeRegistry,
    // Raised when the chain is replaced so searches against the old tip stop.
    cancel: CancelFlag,
}

impl NodeState {
    fn abandon_search(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelFlag::new();
    }
}

pub struct Node<F> {
    state: Arc<Mutex<NodeState>>,
    resolver: Arc<Resolver<F>>,
}

impl<F> Clone for Node<F> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<F: PeerFetch> Node<F> {
    pub fn new(config: NodeConfig, fetcher: F) -> Self {
        let state = NodeState {
            ledger: Ledger::new(config.node_id, config.pow),
            registry: NodeRegistry::new(),
            cancel: CancelFlag::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            resolver: Arc::new(Resolver::new(fetcher, config.resolver)),
        }
    }

    pub async fn node_id(&self) -> String {
        self.state.lock().await.ledger.node_id().to_string()
    }

    pub async fn difficulty(&self) -> usize {
        self.state.lock().await.ledger.pow().difficulty()
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.state.lock().await.ledger.chain().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    pub async fn last_block(&self) -> Block {
        self.state.lock().await.ledger.last_block().clone()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.state.lock().await.ledger.pending().to_vec()
    }

    pub async fn new_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        let mut state = self.state.lock().await;
        state.ledger.new_transaction(sender, recipient, amount)
    }

    /// Register every address, or none of them if any is unusable.
    pub async fn register_nodes<S: AsRef<str>>(&self, addresses: &[S]) -> Result<Vec<String>> {
        if addresses.is_empty() {
            return Err(LedgerError::EmptyNodeList);
        }
        for address in addresses {
            network_location(address.as_ref())?;
        }
        let mut state = self.state.lock().await;
        for address in addresses {
            state.registry.register_node(address.as_ref())?;
        }
        Ok(state.registry.nodes())
    }

    pub async fn nodes(&self) -> Vec<String> {
        self.state.lock().await.registry.nodes()
    }

    /// Mine one block on top of the current tip.
    ///
    /// The proof search runs on the blocking pool without the lock held. The
    /// block is appended only if the tip is still the one the search started
    /// from.
    pub async fn mine(&self) -> MineOutcome {
        let (pow, last_proof, tip_hash, cancel) = {
            let state = self.state.lock().await;
            let last = state.ledger.last_block();
            (*state.ledger.pow(), last.proof, last.hash(), state.cancel.clone())
        };

        let search = tokio::task::spawn_blocking(move || mine::search(&pow, last_proof, &cancel));
        let proof = match search.await {
            Ok(Some(proof)) => proof,
            Ok(None) => return MineOutcome::Cancelled,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!(%err, "proof search task did not complete");
                return MineOutcome::Cancelled;
            }
        };

        let mut state = self.state.lock().await;
        if state.ledger.last_block().hash() != tip_hash {
            debug!(proof, "tip moved during search, discarding proof");
            return MineOutcome::Stale;
        }
        MineOutcome::Forged(state.ledger.forge(proof).clone())
    }

    /// Replace the local chain with the longest valid peer chain, if one is
    /// strictly longer. Returns whether the chain was replaced.
    ///
    /// Fetching and validation both run without the lock; it is taken only
    /// to re-check the length and swap the chain in.
    pub async fn resolve_conflicts(&self) -> bool {
        let (peers, pow, local_len) = {
            let state = self.state.lock().await;
            (
                state.registry.nodes(),
                *state.ledger.pow(),
                state.ledger.len(),
            )
        };
        if peers.is_empty() {
            debug!("no peers registered, nothing to resolve");
            return false;
        }
        let results = self.resolver.fetch_all(peers).await;

        let selection =
            tokio::task::spawn_blocking(move || consensus::select_best(&pow, local_len, results));
        let best = match selection.await {
            Ok(Some(best)) => best,
            Ok(None) => {
                info!(length = local_len, "our chain is authoritative");
                return false;
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!(%err, "chain selection task did not complete");
                return false;
            }
        };

        let mut state = self.state.lock().await;
        if !state.ledger.adopt_verified(best) {
            return false;
        }
        state.abandon_search();
        true
    }
}
