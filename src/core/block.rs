use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::transaction::Transaction;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Fixed proof of the genesis block; it is never checked against the PoW target.
pub const GENESIS_PROOF: u64 = 100;
/// Difficulty a fresh chain starts at, and the fallback for blocks that omit the field.
pub const INITIAL_DIFFICULTY: u32 = 4;

fn default_difficulty() -> u32 {
    INITIAL_DIFFICULTY
}

/// A block in the chain. `index` is 1-based: the genesis block has index 1.
///
/// `transactions[0]` is always the coinbase paying the reward to `miner`;
/// the remainder is the mempool drained at mine time, in insertion order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
    pub miner: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
}

impl Block {
    /// Canonical SHA-256 hash of the block, as lowercase hex.
    ///
    /// The block is rendered as canonical JSON (keys sorted at every depth)
    /// with the `transactions` array re-sorted by each transaction's own
    /// canonical bytes. The sort happens only at hash time; the stored
    /// transaction order is never touched. Peers must hash identically or
    /// their chains will never validate against each other.
    pub fn hash(&self) -> String {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(transactions) = value
            .get_mut("transactions")
            .and_then(|txs| txs.as_array_mut())
        {
            transactions.sort_by_cached_key(|tx| tx.to_string());
        }
        hex::encode(Sha256::digest(value.to_string().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;

    fn sample_block(transactions: Vec<Transaction>) -> Block {
        Block {
            index: 2,
            timestamp: 1_700_000_000.25,
            transactions,
            proof: 35293,
            previous_hash: "a".repeat(64),
            miner: "miner-address".to_string(),
            difficulty: 4,
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let block = sample_block(vec![]);
        assert_eq!(block.hash(), block.hash());
        assert_eq!(block.hash().len(), 64);
    }

    #[test]
    fn hash_survives_serialization_round_trip() {
        let block = sample_block(vec![Transaction::new(
            "alice".to_string(),
            "bob".to_string(),
            12.5,
            "sig".to_string(),
        )]);
        let encoded = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn hash_ignores_stored_transaction_order() {
        let a = Transaction::new("a".to_string(), "b".to_string(), 1.0, "s1".to_string());
        let b = Transaction::new("c".to_string(), "d".to_string(), 2.0, "s2".to_string());
        let forward = sample_block(vec![a.clone(), b.clone()]);
        let reversed = sample_block(vec![b, a]);
        assert_eq!(forward.hash(), reversed.hash());
        // stored order itself is preserved
        assert_eq!(forward.transactions[0].sender, "a");
        assert_eq!(reversed.transactions[0].sender, "c");
    }

    #[test]
    fn missing_difficulty_defaults_to_initial() {
        let json = r#"{
            "index": 3,
            "timestamp": 1.0,
            "transactions": [],
            "proof": 7,
            "previous_hash": "1",
            "miner": "m"
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.difficulty, INITIAL_DIFFICULTY);
    }
}
