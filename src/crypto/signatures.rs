use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("signing failed")]
    Signing,
    #[error("key encoding failed")]
    KeyEncoding,
}

/// SHA-256 digest of the canonical JSON of `{sender, recipient, amount}`.
/// Signer and verifier must build this identically or no signature will
/// ever check out.
fn transaction_digest(sender: &str, recipient: &str, amount: f64) -> Sha256 {
    let payload = serde_json::json!({
        "sender": sender,
        "recipient": recipient,
        "amount": amount,
    });
    Sha256::new_with_prefix(payload.to_string().as_bytes())
}

/// Sign a transfer with a PKCS#8 PEM private key. Returns the ECDSA P-256
/// signature in fixed-size r||s form, base64-encoded.
pub fn sign_transaction(
    private_key_pem: &str,
    sender: &str,
    recipient: &str,
    amount: f64,
) -> Result<String, CryptoError> {
    let key =
        SigningKey::from_pkcs8_pem(private_key_pem).map_err(|_| CryptoError::InvalidPrivateKey)?;
    let signature: Signature = key
        .try_sign_digest(transaction_digest(sender, recipient, amount))
        .map_err(|_| CryptoError::Signing)?;
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Verify a transfer signature against the public key encoded in `address`
/// (base64 of the DER-serialized P-256 public key).
///
/// Every decoding or verification failure yields `false`; nothing escapes.
pub fn verify_signature(
    address: &str,
    signature_b64: &str,
    sender: &str,
    recipient: &str,
    amount: f64,
) -> bool {
    let der = match BASE64.decode(address) {
        Ok(der) => der,
        Err(_) => return false,
    };
    let key = match VerifyingKey::from_public_key_der(&der) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let raw = match BASE64.decode(signature_b64) {
        Ok(raw) => raw,
        Err(_) => return false,
    };
    let signature = match Signature::from_slice(&raw) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    key.verify_digest(transaction_digest(sender, recipient, amount), &signature)
        .is_ok()
}
