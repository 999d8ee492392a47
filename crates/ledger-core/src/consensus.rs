//! Longest-valid-chain conflict resolution.
//!
//! Peer chains are fetched concurrently (bounded by a semaphore, each fetch
//! under its own timeout) and then compared in one aggregation step. Any peer
//! that fails to answer, answers badly, or serves an invalid chain is skipped.

use crate::constants::{DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::error::FetchError;
use crate::pow::ProofOfWork;
use crate::validate;
use crate::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What a peer advertises at its chain endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerChain {
    pub length: u64,
    pub chain: Vec<Block>,
}

impl PeerChain {
    /// Decode a chain endpoint body. Anything other than a numeric `length`
    /// next to a list of well-formed blocks is `Malformed`.
    pub fn from_value(mut body: Value) -> Result<Self, FetchError> {
        let length = body
            .get("length")
            .and_then(Value::as_u64)
            .ok_or_else(|| FetchError::Malformed("missing or non-numeric `length`".into()))?;
        let chain = body.get_mut("chain").map(Value::take).unwrap_or(Value::Null);
        let chain = validate::parse_chain(chain).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(Self { length, chain })
    }
}

/// Retrieves a peer's chain. Implemented by the transport layer.
pub trait PeerFetch: Send + Sync + 'static {
    fn fetch_chain(
        &self,
        peer: &str,
    ) -> impl Future<Output = Result<PeerChain, FetchError>> + Send;
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

pub type FetchResult = (String, Result<PeerChain, FetchError>);

pub struct Resolver<F> {
    fetcher: Arc<F>,
    config: ResolverConfig,
}

impl<F: PeerFetch> Resolver<F> {
    pub fn new(fetcher: F, config: ResolverConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// Fetch every peer's chain, at most `max_concurrent_fetches` at a time.
    /// Results come back sorted by peer address.
    pub async fn fetch_all(&self, peers: Vec<String>) -> Vec<FetchResult> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
        let limit = self.config.fetch_timeout;
        let mut tasks = JoinSet::new();

        for peer in peers {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = match timeout(limit, fetcher.fetch_chain(&peer)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(limit)),
                };
                (peer, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => warn!(%err, "peer fetch task failed"),
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}

/// Pick the replacement chain, if any. A candidate must advertise a length
/// strictly greater than the best seen so far (starting at `local_len`), send
/// exactly that many blocks, be laid out like a locally built chain, and
/// validate. Equal lengths never win; among
/// several longer chains the first to beat the running best is kept.
pub fn select_best<I>(pow: &ProofOfWork, local_len: usize, candidates: I) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = FetchResult>,
{
    let mut best_length = local_len as u64;
    let mut best_chain = None;

    for (peer, result) in candidates {
        let PeerChain { length, chain } = match result {
            Ok(peer_chain) => peer_chain,
            Err(err) => {
                warn!(%peer, %err, "skipping peer");
                continue;
            }
        };
        if length != chain.len() as u64 {
            warn!(%peer, length, blocks = chain.len(), "skipping peer: length does not match chain");
            continue;
        }
        if length <= best_length {
            debug!(%peer, length, best_length, "peer chain is not longer");
            continue;
        }
        match validate::verify_candidate(pow, &chain) {
            Ok(()) => {
                info!(%peer, length, "found longer valid chain");
                best_length = length;
                best_chain = Some(chain);
            }
            Err(err) => warn!(%peer, %err, "skipping peer: invalid chain"),
        }
    }
    best_chain
}
