use std::collections::HashSet;

use thiserror::Error;

use crate::consensus::ledger::Ledger;
use crate::core::block::Block;
use crate::core::transaction::{Transaction, SYSTEM_COINBASE};
use crate::crypto::verify_signature;

/// Policy rejections surfaced to transaction authors. No state changes and
/// nothing is gossiped when admission fails.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Error: Cannot manually create a {SYSTEM_COINBASE} transaction.")]
    CoinbaseForgery,
    #[error("Error: Invalid transaction amount.")]
    InvalidAmount,
    #[error("Error: Invalid digital signature. Transaction rejected.")]
    InvalidSignature,
    #[error("Error: Insufficient funds. Transaction rejected.")]
    InsufficientFunds,
}

/// Pending transactions not yet included in any block on the local chain,
/// in submission order.
#[derive(Debug, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    /// Admit a transaction: no coinbase forgery, a verifying signature under
    /// the sender's key, and funds covering the amount on the mined chain.
    ///
    /// Duplicates are allowed in; the drain at mine time keeps only the
    /// first copy. Funds are checked against mined balances only, so a
    /// sender can enqueue conflicting spends -- whichever fits clears when
    /// mined.
    pub fn admit(&mut self, tx: Transaction, ledger: &Ledger) -> Result<(), AdmissionError> {
        if tx.is_coinbase() {
            return Err(AdmissionError::CoinbaseForgery);
        }
        if !tx.amount.is_finite() || tx.amount < 0.0 {
            return Err(AdmissionError::InvalidAmount);
        }
        if !verify_signature(&tx.sender, &tx.signature, &tx.sender, &tx.recipient, tx.amount) {
            return Err(AdmissionError::InvalidSignature);
        }
        if !ledger.has_sufficient_funds(&tx.sender, tx.amount) {
            return Err(AdmissionError::InsufficientFunds);
        }

        self.pending.push(tx);
        tracing::debug!(pending = self.pending.len(), "transaction admitted to mempool");
        Ok(())
    }

    /// Take every pending transaction for inclusion in a block, dropping
    /// duplicate copies (first submission wins).
    pub fn drain(&mut self) -> Vec<Transaction> {
        let mut seen = HashSet::new();
        self.pending
            .drain(..)
            .filter(|tx| seen.insert(tx.canonical_json()))
            .collect()
    }

    /// After a chain swap, keep only transactions that do not already appear
    /// in the adopted history. Locally submitted transfers the new chain
    /// missed stay queued for the next mine.
    pub fn rebase(&mut self, adopted: &[Block]) {
        let mined: HashSet<String> = adopted
            .iter()
            .flat_map(|block| &block.transactions)
            .filter(|tx| !tx.is_coinbase())
            .map(|tx| tx.canonical_json())
            .collect();

        let before = self.pending.len();
        self.pending.retain(|tx| !mined.contains(&tx.canonical_json()));
        if self.pending.len() < before {
            tracing::info!(
                dropped = before - self.pending.len(),
                kept = self.pending.len(),
                "mempool rebased onto adopted chain"
            );
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
