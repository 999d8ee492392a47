use ledger_core::consensus::{PeerChain, PeerFetch};
use ledger_core::FetchError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fetches peer chains from their `GET /chain` endpoint.
#[derive(Clone, Debug)]
pub struct HttpPeers {
    client: Client,
}

impl HttpPeers {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl PeerFetch for HttpPeers {
    async fn fetch_chain(&self, peer: &str) -> Result<PeerChain, FetchError> {
        let url = format!("http://{peer}/chain");
        debug!(%url, "fetching peer chain");
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = res
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        PeerChain::from_value(body)
    }
}
