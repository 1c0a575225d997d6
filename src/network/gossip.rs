use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::storage::Store;

/// Timeout for block notifications.
const BLOCK_BROADCAST_TIMEOUT: Duration = Duration::from_secs(3);
/// Timeout for transaction fan-out.
const TX_BROADCAST_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for fetching a peer's full chain during consensus.
const CHAIN_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A peer's `/chain` response.
#[derive(Debug, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Fan-out client for blocks and transactions.
///
/// Peer failures are never fatal: unreachable or erroring peers are skipped
/// and the broadcast continues. Block fan-out re-reads the peer set from
/// disk first, so the effective set is the latest persisted one even when
/// several transport workers share the state file.
pub struct Gossip {
    client: reqwest::Client,
    store: Arc<Store>,
}

/// Peers are stored as bare `host:port`; prepend a scheme when missing.
fn peer_url(peer: &str, path: &str) -> String {
    if peer.starts_with("http://") || peer.starts_with("https://") {
        format!("{}{}", peer.trim_end_matches('/'), path)
    } else {
        format!("http://{}{}", peer.trim_end_matches('/'), path)
    }
}

impl Gossip {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            client: reqwest::Client::new(),
            store,
        }
    }

    /// Notify every persisted peer of a freshly mined block. Returns the
    /// number of peers that acknowledged.
    pub async fn broadcast_block(&self, block: &Block) -> usize {
        let peers = self.store.load_peers();
        if peers.is_empty() {
            return 0;
        }

        let payload = json!({ "block": block });
        let mut delivered = 0;
        for peer in &peers {
            match self
                .client
                .post(peer_url(peer, "/blocks/new"))
                .json(&payload)
                .timeout(BLOCK_BROADCAST_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => delivered += 1,
                Ok(response) => {
                    tracing::warn!(%peer, status = %response.status(), "block broadcast refused");
                }
                Err(err) => {
                    tracing::warn!(%peer, %err, "peer unreachable during block broadcast");
                }
            }
        }
        tracing::info!(
            index = block.index,
            delivered,
            total = peers.len(),
            "block broadcast complete"
        );
        delivered
    }

    /// Fan a newly admitted transaction out to every persisted peer.
    pub async fn broadcast_transaction(&self, tx: &Transaction) -> usize {
        let peers = self.store.load_peers();
        let mut delivered = 0;
        for peer in &peers {
            match self
                .client
                .post(peer_url(peer, "/transactions/new"))
                .json(tx)
                .timeout(TX_BROADCAST_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => delivered += 1,
                Ok(response) => {
                    tracing::debug!(%peer, status = %response.status(), "transaction broadcast refused");
                }
                Err(err) => {
                    tracing::debug!(%peer, %err, "peer unreachable during transaction broadcast");
                }
            }
        }
        delivered
    }

    /// Fetch a peer's full chain for the consensus sweep. Any transport or
    /// decoding failure counts as the peer being unreachable.
    pub async fn fetch_chain(&self, peer: &str) -> Option<ChainSnapshot> {
        let response = self
            .client
            .get(peer_url(peer, "/chain"))
            .timeout(CHAIN_FETCH_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            tracing::debug!(%peer, status = %response.status(), "chain fetch refused");
            return None;
        }
        match response.json::<ChainSnapshot>().await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::debug!(%peer, %err, "undecodable chain from peer");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_prepended_only_when_missing() {
        assert_eq!(
            peer_url("localhost:5001", "/chain"),
            "http://localhost:5001/chain"
        );
        assert_eq!(
            peer_url("http://localhost:5001", "/chain"),
            "http://localhost:5001/chain"
        );
        assert_eq!(
            peer_url("https://node.example.com/", "/blocks/new"),
            "https://node.example.com/blocks/new"
        );
    }
}
