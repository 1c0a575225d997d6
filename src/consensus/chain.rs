use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consensus::mempool::Mempool;
use crate::core::block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, INITIAL_DIFFICULTY};
use crate::core::transaction::Transaction;

/// Target seconds between blocks.
const BLOCK_GENERATION_INTERVAL: u64 = 600;
/// Retarget window, in blocks.
const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;
/// Coinbase reward before any halving.
const INITIAL_REWARD: f64 = 50.0;
/// Blocks between reward halvings.
const HALVING_INTERVAL: u64 = 210_000;
/// Rewards below this floor are paid as exactly zero.
const REWARD_DUST_FLOOR: f64 = 1e-8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChainValidationError {
    #[error("Block {index} has invalid previous hash")]
    PreviousHashMismatch { index: u64 },
    #[error("Block {index} has invalid proof")]
    InvalidProof { index: u64 },
}

/// The chain engine: block construction, proof-of-work, difficulty
/// retargeting, the reward schedule, and full-chain validation.
///
/// The engine owns only the chain and the current difficulty. Persistence
/// and gossip are driven by the node facade, which also holds the lock
/// serializing every mutation.
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub difficulty: u32,
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

impl Blockchain {
    /// Start a fresh chain: genesis at index 1 with the fixed proof and
    /// previous-hash sentinel, paying its coinbase to the bootstrapping node.
    pub fn bootstrap(node_address: &str) -> Self {
        let mut blockchain = Self {
            chain: Vec::new(),
            difficulty: INITIAL_DIFFICULTY,
        };
        let mut mempool = Mempool::default();
        blockchain.new_block(
            GENESIS_PROOF,
            GENESIS_PREVIOUS_HASH.to_string(),
            node_address,
            &mut mempool,
        );
        blockchain
    }

    /// Rebuild the engine from persisted state.
    pub fn from_parts(chain: Vec<Block>, difficulty: u32) -> Self {
        Self {
            chain,
            difficulty: difficulty.max(1),
        }
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always holds genesis")
    }

    /// Build the next block from the drained mempool, prefixed with the
    /// coinbase for its index, and append it. The caller persists, runs
    /// [`Blockchain::retarget_if_due`], and gossips.
    pub fn new_block(
        &mut self,
        proof: u64,
        previous_hash: String,
        miner: &str,
        mempool: &mut Mempool,
    ) -> Block {
        let index = self.chain.len() as u64 + 1;
        let coinbase = Transaction::coinbase(miner, Self::mining_reward(index));
        let mut transactions = vec![coinbase];
        transactions.extend(mempool.drain());

        let block = Block {
            index,
            timestamp: unix_now(),
            transactions,
            proof,
            previous_hash,
            miner: miner.to_string(),
            difficulty: self.difficulty,
        };
        self.chain.push(block.clone());
        block
    }

    /// The proof-of-work predicate: SHA-256 of `anchor || decimal(proof)`
    /// must start with `difficulty` hex zeros.
    pub fn valid_proof(anchor: &str, proof: u64, difficulty: u32) -> bool {
        let guess = format!("{}{}", anchor, proof);
        let digest = hex::encode(Sha256::digest(guess.as_bytes()));
        digest.starts_with(&"0".repeat(difficulty as usize))
    }

    /// Linear proof search under the engine's current difficulty, anchored
    /// on the hash of the last block. Blocks the calling worker until a
    /// proof is found.
    pub fn proof_of_work(&self, last_block: &Block) -> u64 {
        let anchor = last_block.hash();
        let mut proof = 0u64;
        while !Self::valid_proof(&anchor, proof, self.difficulty) {
            proof += 1;
        }
        proof
    }

    /// Adjust difficulty when the chain height has just crossed a retarget
    /// boundary. A no-op at every other height.
    pub fn retarget_if_due(&mut self) {
        let height = self.chain.len() as u64;
        if height == 0 || height % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
            return;
        }
        self.adjust_difficulty();
    }

    fn adjust_difficulty(&mut self) {
        if self.chain.len() < DIFFICULTY_ADJUSTMENT_INTERVAL as usize {
            return;
        }
        let window_start = &self.chain[self.chain.len() - DIFFICULTY_ADJUSTMENT_INTERVAL as usize];
        let last = self.last_block();

        let time_taken = last.timestamp - window_start.timestamp;
        let expected = (DIFFICULTY_ADJUSTMENT_INTERVAL * BLOCK_GENERATION_INTERVAL) as f64;

        if time_taken < expected * 0.75 {
            self.difficulty += 1;
            tracing::info!(difficulty = self.difficulty, "difficulty raised: fast window");
        } else if time_taken > expected * 1.25 && self.difficulty > 1 {
            self.difficulty -= 1;
            tracing::info!(difficulty = self.difficulty, "difficulty lowered: slow window");
        }
    }

    /// Coinbase reward for a block at `index`: 50 halved every 210 000
    /// blocks, flooring to exactly zero below 1e-8.
    pub fn mining_reward(index: u64) -> f64 {
        let halvings = index / HALVING_INTERVAL;
        let reward = INITIAL_REWARD / 2f64.powi(halvings.min(i32::MAX as u64) as i32);
        if reward < REWARD_DUST_FLOOR {
            0.0
        } else {
            reward
        }
    }

    /// Full-chain validation, used on candidate chains offered by peers.
    ///
    /// Each link is checked for hash continuity and proof-of-work. The
    /// proof check anchors on the block's stored `previous_hash` and uses
    /// the *previous* block's stored difficulty (falling back to the
    /// initial difficulty when the field was absent on the wire) -- so a
    /// retarget only binds one block later than it was computed.
    /// Transaction signatures are not re-checked here.
    pub fn validate_chain(chain: &[Block]) -> Result<(), ChainValidationError> {
        let mut last = match chain.first() {
            Some(genesis) => genesis,
            None => return Ok(()),
        };

        for block in &chain[1..] {
            if block.previous_hash != last.hash() {
                return Err(ChainValidationError::PreviousHashMismatch { index: block.index });
            }
            if !Self::valid_proof(&block.previous_hash, block.proof, last.difficulty) {
                return Err(ChainValidationError::InvalidProof { index: block.index });
            }
            last = block;
        }
        Ok(())
    }
}
