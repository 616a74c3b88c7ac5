//! AEAD encryption - AES-256-GCM
//!
//! Every call to [`encrypt`] draws its own 96-bit nonce from the OS RNG and
//! returns it inside the [`SealedPayload`]; callers never pick nonces.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use super::keys::{fill_random, KEY_LEN, NONCE_LEN};
use super::sealed::SealedPayload;
use crate::error::{Result, RoomKeyError};

fn cipher_for(key: &[u8; KEY_LEN]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key)
        .map_err(|e| RoomKeyError::InvalidInput(format!("AES-256-GCM key: {}", e)))
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<SealedPayload> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| RoomKeyError::InvalidInput(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(SealedPayload::new(nonce_bytes, ciphertext))
}

/// Decrypt and verify. A bad tag is always `AuthenticationFailure`.
pub fn decrypt(key: &[u8; KEY_LEN], sealed: &SealedPayload) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = cipher_for(key)?;
    let nonce = Nonce::from_slice(sealed.nonce());

    let plaintext = cipher
        .decrypt(nonce, sealed.ciphertext())
        .map_err(|_| RoomKeyError::AuthenticationFailure)?;

    Ok(Zeroizing::new(plaintext))
}

pub fn encrypt_text(key: &[u8; KEY_LEN], text: &str) -> Result<SealedPayload> {
    encrypt(key, text.as_bytes())
}

pub fn decrypt_text(key: &[u8; KEY_LEN], sealed: &SealedPayload) -> Result<String> {
    let plaintext = decrypt(key, sealed)?;
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| RoomKeyError::MalformedEncoding("plaintext is not valid UTF-8".into()))
}
