//! Key types and the room key generator
//!
//! Both the shared room key and the per-participant key-wrapping key are
//! 256-bit AES keys held in `SecretBox` so they are zeroized on drop and
//! never printed.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};

use crate::error::{Result, RoomKeyError};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Fill `buf` from the operating system CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| RoomKeyError::RandomSource(e.to_string()))
}

/// Symmetric key shared by every participant of one room.
///
/// Generated once at room creation and afterwards only ever recovered by
/// unwrapping a participant's `WrappedRoomKey`.
pub struct RoomKey {
    inner: SecretBox<[u8; KEY_LEN]>,
}

impl RoomKey {
    /// Generate a fresh room key from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        fill_random(&mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Rebuild a key from an unwrapped plaintext of unknown length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            RoomKeyError::InvalidInput(format!(
                "room key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::from_bytes(arr))
    }

    /// Raw key bytes. Only the cipher and the wrapping layer need these.
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }
}

impl Clone for RoomKey {
    fn clone(&self) -> Self {
        Self::from_bytes(*self.expose())
    }
}

impl PartialEq for RoomKey {
    fn eq(&self, other: &Self) -> bool {
        // Not constant-time. Never compare against attacker-supplied bytes.
        self.expose() == other.expose()
    }
}

impl Eq for RoomKey {}

impl std::fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RoomKey([REDACTED])")
    }
}

/// Key derived from one participant's passphrase. Never persisted.
pub struct KeyWrappingKey {
    inner: SecretBox<[u8; KEY_LEN]>,
}

impl KeyWrappingKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: SecretBox::new(Box::new(bytes)),
        }
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }
}

impl std::fmt::Debug for KeyWrappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyWrappingKey([REDACTED])")
    }
}
