use serde::{Deserialize, Serialize};

/// Reserved sender address for newly minted supply.
pub const SYSTEM_COINBASE: &str = "SYSTEM_COINBASE";
/// Placeholder signature carried by coinbase transactions.
const COINBASE_SIGNATURE: &str = "GENESIS_SIG";

/// A signed value transfer. Immutable once constructed.
///
/// For every non-coinbase transaction the signature must verify over the
/// canonical JSON of `{sender, recipient, amount}` under the public key
/// encoded in `sender`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub signature: String,
}

impl Transaction {
    pub fn new(sender: String, recipient: String, amount: f64, signature: String) -> Self {
        Self {
            sender,
            recipient,
            amount,
            signature,
        }
    }

    /// The coinbase transaction minting `amount` to `miner`.
    pub fn coinbase(miner: &str, amount: f64) -> Self {
        Self {
            sender: SYSTEM_COINBASE.to_string(),
            recipient: miner.to_string(),
            amount,
            signature: COINBASE_SIGNATURE.to_string(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == SYSTEM_COINBASE
    }

    /// Canonical JSON form: keys sorted, no whitespace. This is the identity
    /// used for mempool deduplication and for the hash-time ordering of a
    /// block's transactions.
    pub fn canonical_json(&self) -> String {
        serde_json::to_value(self)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }
}
