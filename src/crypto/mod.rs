use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    CryptoFailure(String),
    #[error("decryption failed: authentication tag mismatch or wrong password")]
    DecryptionAuthFailure,
}

/// Derive a 256-bit AES key from a password and salt.
/// PBKDF2-HMAC-SHA256, 100,000 iterations.
fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; config::KEY_SIZE], CryptoError> {
    let mut key = [0u8; config::KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password.as_bytes(),
        salt,
        config::PBKDF2_ITERATIONS,
        &mut key,
    )
    .map_err(|e| CryptoError::CryptoFailure(e.to_string()))?;
    Ok(key)
}

/// Encrypt a byte stream under a password.
/// Returns the self-describing envelope `salt(16) || iv(12) || ciphertext+tag`.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; config::SALT_SIZE];
    let mut iv = [0u8; config::IV_SIZE];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::CryptoFailure(e.to_string()))?;
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::CryptoFailure(e.to_string()))?;

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::CryptoFailure(e.to_string()))?;

    let mut envelope = Vec::with_capacity(config::ENVELOPE_OVERHEAD + plaintext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope produced by [`encrypt`]. The trailing 16 bytes of the
/// ciphertext are the GCM tag; any tampering or a wrong password fails
/// authentication.
pub fn decrypt(envelope: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < config::ENVELOPE_OVERHEAD {
        return Err(CryptoError::DecryptionAuthFailure);
    }

    let (salt, rest) = envelope.split_at(config::SALT_SIZE);
    let (iv, ciphertext) = rest.split_at(config::IV_SIZE);

    let key = derive_key(password, salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::DecryptionAuthFailure)
}
