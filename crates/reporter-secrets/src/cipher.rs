//! AES-256-GCM encryption of short secret blobs.
//!
//! Each secret is stored as a `(ciphertext, nonce)` pair, both base64. A
//! fresh random 96-bit nonce is drawn on every encrypt call; the master key
//! is used as the cipher key directly.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

use crate::error::{Result, SecretError};
use crate::types::EncryptedSecret;

/// Master key length in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;

/// Encrypt `plaintext` under `key`, drawing a fresh nonce.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<EncryptedSecret> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedSecret {
        ciphertext: BASE64.encode(ciphertext),
        nonce: BASE64.encode(nonce_bytes),
    })
}

/// Decrypt a secret previously produced by [`encrypt`].
///
/// Any failure -- bad base64, wrong nonce length, failed authentication,
/// non-UTF-8 plaintext -- surfaces as [`SecretError::CorruptedSecret`]
/// without partial output.
pub fn decrypt(secret: &EncryptedSecret, key: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| SecretError::CorruptedSecret("invalid key length".to_string()))?;

    let ciphertext = BASE64
        .decode(&secret.ciphertext)
        .map_err(|_| SecretError::CorruptedSecret("ciphertext is not valid base64".to_string()))?;
    let nonce_bytes = BASE64
        .decode(&secret.nonce)
        .map_err(|_| SecretError::CorruptedSecret("nonce is not valid base64".to_string()))?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(SecretError::CorruptedSecret(
            "nonce has wrong length".to_string(),
        ));
    }

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| SecretError::CorruptedSecret("authentication failed".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| SecretError::CorruptedSecret("plaintext is not valid UTF-8".to_string()))
}

/// Generate a new random 256-bit master key.
pub fn generate_key() -> Vec<u8> {
    let mut key = vec![0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
