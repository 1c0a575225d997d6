use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::SigningKey;
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::signatures::{sign_transaction, CryptoError};

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("wallet file not found: {0}")]
    NotFound(PathBuf),
}

/// An ECDSA P-256 keypair. The private key is stored as PKCS#8 PEM; the
/// address handed out to the world is the base64 of the DER-serialized
/// public key.
///
/// Wallet files are plain JSON `{private_key, public_address}`; whoever
/// holds the file holds the coins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    pub private_key: String,
    pub public_address: String,
}

impl Drop for Wallet {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl Wallet {
    /// Generate a fresh keypair.
    pub fn generate() -> Result<Self, WalletError> {
        let signing_key = SigningKey::random(&mut OsRng);
        let private_key = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| CryptoError::KeyEncoding)?
            .to_string();
        let public_der = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|_| CryptoError::KeyEncoding)?;
        Ok(Self {
            private_key,
            public_address: BASE64.encode(public_der.as_bytes()),
        })
    }

    /// Sign a transfer from this wallet's address.
    pub fn sign(&self, recipient: &str, amount: f64) -> Result<String, CryptoError> {
        sign_transaction(&self.private_key, &self.public_address, recipient, amount)
    }

    /// Save the wallet as JSON under `dir`, returning the full path.
    pub fn save(&self, dir: impl AsRef<Path>, filename: &str) -> Result<PathBuf, WalletError> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(filename);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Load a wallet file previously written by [`Wallet::save`].
    pub fn load(dir: impl AsRef<Path>, filename: &str) -> Result<Self, WalletError> {
        let path = dir.as_ref().join(filename);
        if !path.exists() {
            return Err(WalletError::NotFound(path));
        }
        Ok(serde_json::from_str(&fs::read_to_string(&path)?)?)
    }
}
