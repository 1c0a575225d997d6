pub mod signatures;
pub mod wallet;

pub use signatures::{sign_transaction, verify_signature};
pub use wallet::Wallet;
