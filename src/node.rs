use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::consensus::{AdmissionError, Blockchain, Ledger, Mempool};
use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::network::{Gossip, PeerSet};
use crate::storage::{Store, StorageError};

/// Snapshot returned by [`Node::get_chain`], mirroring the `/chain` wire
/// envelope.
#[derive(Debug, Serialize)]
pub struct ChainView {
    pub chain: Vec<Block>,
    pub length: usize,
    pub difficulty: u32,
}

/// The process-wide node state: everything the facade mutates lives behind
/// one lock, so mining, admission, registration and consensus serialize.
struct NodeState {
    blockchain: Blockchain,
    mempool: Mempool,
    peers: PeerSet,
    ledger: Ledger,
}

/// The operations exposed to the transport layer.
///
/// Every mutating operation takes the write lock for its full duration --
/// including the proof-of-work search, persistence, and gossip -- trading
/// throughput for a state that is impossible to observe half-updated.
/// Read-only operations share the read lock.
pub struct Node {
    state: RwLock<NodeState>,
    store: Arc<Store>,
    gossip: Gossip,
    node_id: String,
}

impl Node {
    /// Open (or initialize) a node rooted at `data_dir`. A persisted chain
    /// is loaded as-is; otherwise a genesis block is mined to `node_id` and
    /// persisted immediately.
    pub fn open(data_dir: impl AsRef<Path>, node_id: impl Into<String>) -> Result<Self, StorageError> {
        let node_id = node_id.into();
        let store = Arc::new(Store::open(data_dir)?);

        let (blockchain, peers) = match store.load() {
            Some(saved) if !saved.chain.is_empty() => {
                tracing::info!(
                    blocks = saved.chain.len(),
                    difficulty = saved.difficulty,
                    "loaded persisted chain"
                );
                (
                    Blockchain::from_parts(saved.chain, saved.difficulty),
                    PeerSet::from_nodes(saved.nodes.into_iter().collect()),
                )
            }
            _ => {
                tracing::info!("no usable state on disk, creating genesis block");
                let blockchain = Blockchain::bootstrap(&node_id);
                store.save(&blockchain.chain, blockchain.difficulty, &HashSet::new())?;
                (blockchain, PeerSet::default())
            }
        };

        let mut ledger = Ledger::default();
        ledger.recalculate(&blockchain.chain);

        Ok(Self {
            state: RwLock::new(NodeState {
                blockchain,
                mempool: Mempool::default(),
                peers,
                ledger,
            }),
            gossip: Gossip::new(Arc::clone(&store)),
            store,
            node_id,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    fn persist(&self, state: &NodeState) {
        if let Err(err) = self.store.save(
            &state.blockchain.chain,
            state.blockchain.difficulty,
            state.peers.nodes(),
        ) {
            // keep the in-memory state; the next successful write overwrites
            tracing::warn!(%err, "failed to persist state");
        }
    }

    /// Mine the next block to `miner`: drain the mempool behind a coinbase,
    /// search the proof, append, persist, retarget when due, then notify
    /// peers. Mining always succeeds locally.
    pub async fn mine(&self, miner: &str) -> Block {
        let mut state = self.state.write().await;

        let last = state.blockchain.last_block().clone();
        let proof = state.blockchain.proof_of_work(&last);
        let previous_hash = last.hash();

        let NodeState {
            blockchain,
            mempool,
            ledger,
            ..
        } = &mut *state;
        let block = blockchain.new_block(proof, previous_hash, miner, mempool);
        ledger.recalculate(&blockchain.chain);
        self.persist(&state);
        state.blockchain.retarget_if_due();

        let delivered = self.gossip.broadcast_block(&block).await;
        tracing::info!(
            index = block.index,
            transactions = block.transactions.len(),
            peers_notified = delivered,
            "mined new block"
        );
        block
    }

    /// Admit a transaction to the mempool and fan it out to peers. Returns
    /// the index of the block it will be included in.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<u64, AdmissionError> {
        let mut state = self.state.write().await;

        let NodeState {
            blockchain,
            mempool,
            ledger,
            ..
        } = &mut *state;
        mempool.admit(tx.clone(), ledger)?;
        let next_index = blockchain.last_block().index + 1;

        let delivered = self.gossip.broadcast_transaction(&tx).await;
        tracing::debug!(peers_notified = delivered, "transaction gossiped");
        Ok(next_index)
    }

    pub async fn get_chain(&self) -> ChainView {
        let state = self.state.read().await;
        ChainView {
            chain: state.blockchain.chain.clone(),
            length: state.blockchain.chain.len(),
            difficulty: state.blockchain.difficulty,
        }
    }

    pub async fn get_balance(&self, address: &str) -> f64 {
        self.state.read().await.ledger.get_balance(address)
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().await.mempool.transactions().to_vec()
    }

    /// Register peers and persist the updated set. Returns the full set.
    pub async fn register_peers(&self, addresses: &[String]) -> Vec<String> {
        let mut state = self.state.write().await;
        for address in addresses {
            if state.peers.register(address) {
                tracing::info!(%address, "registered peer");
            }
        }
        self.persist(&state);
        state.peers.to_vec()
    }

    pub async fn peer_list(&self) -> Vec<String> {
        self.state.read().await.peers.to_vec()
    }

    /// Handle an inbound block notification. The payload itself is ignored:
    /// running the full consensus procedure avoids splicing a block onto a
    /// stale or diverged chain.
    pub async fn receive_block(&self) -> bool {
        self.resolve().await
    }

    /// Longest-valid-chain conflict resolution. Sweeps every known peer,
    /// adopts the strictly longest chain that validates, then rebases the
    /// mempool, recomputes balances and persists. Returns whether the local
    /// chain was replaced. Ties keep the local chain.
    pub async fn resolve(&self) -> bool {
        let mut state = self.state.write().await;

        let mut best_length = state.blockchain.chain.len();
        let mut candidate: Option<Vec<Block>> = None;

        let peers = state.peers.to_vec();
        for peer in &peers {
            let Some(snapshot) = self.gossip.fetch_chain(peer).await else {
                continue;
            };
            // an empty chain can never be adopted, whatever length it claims
            if snapshot.length <= best_length || snapshot.chain.is_empty() {
                continue;
            }
            match Blockchain::validate_chain(&snapshot.chain) {
                Ok(()) => {
                    best_length = snapshot.length;
                    candidate = Some(snapshot.chain);
                }
                Err(reason) => {
                    tracing::warn!(%peer, %reason, "discarding invalid candidate chain");
                }
            }
        }

        match candidate {
            Some(chain) => {
                let NodeState {
                    blockchain,
                    mempool,
                    ledger,
                    ..
                } = &mut *state;
                mempool.rebase(&chain);
                blockchain.chain = chain;
                ledger.recalculate(&blockchain.chain);
                self.persist(&state);
                tracing::info!(
                    length = state.blockchain.chain.len(),
                    "chain replaced by a longer valid peer chain"
                );
                true
            }
            None => false,
        }
    }
}
