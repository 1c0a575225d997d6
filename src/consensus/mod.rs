pub mod chain;
pub mod ledger;
pub mod mempool;

pub use chain::{Blockchain, ChainValidationError};
pub use ledger::Ledger;
pub use mempool::{AdmissionError, Mempool};
