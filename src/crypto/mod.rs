//! Cryptographic primitives - PBKDF2/Argon2id, SHA-256, AES-256-GCM

mod aead;
mod fingerprint;
mod kdf;
mod keys;
mod sealed;

pub use aead::{decrypt, decrypt_text, encrypt, encrypt_text};
pub use fingerprint::{fingerprint, PassphraseFingerprint, FINGERPRINT_HEX_LEN};
pub use kdf::{
    derive_key, KdfParams, MAX_ARGON2_MEMORY_KIB, MAX_ARGON2_PARALLELISM, MAX_ARGON2_TIME_COST,
    MAX_PBKDF2_ITERATIONS, MIN_ARGON2_MEMORY_KIB, MIN_PBKDF2_ITERATIONS,
};
pub use keys::{KeyWrappingKey, RoomKey, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use sealed::{SealedPayload, SEPARATOR};

pub(crate) use keys::fill_random;
