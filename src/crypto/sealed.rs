//! Text wire format for AEAD output
//!
//! ```text
//! <nonce: 24 lowercase hex chars>:<ciphertext || tag: lowercase hex>
//! ```
//!
//! Used for both wrapped room keys and message/archive payloads, and
//! stored as-is in a plain text column.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::keys::{NONCE_LEN, TAG_LEN};
use crate::error::RoomKeyError;

/// Separator between nonce and ciphertext. Never a hex digit.
pub const SEPARATOR: char = ':';

/// Nonce plus ciphertext-with-tag from one AEAD encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedPayload {
    pub(crate) fn new(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Self {
        Self { nonce, ciphertext }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the 16-byte GCM tag at the end.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Mutable access for corruption tests.
    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }
}

impl std::fmt::Display for SealedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            hex::encode(self.nonce),
            SEPARATOR,
            hex::encode(&self.ciphertext)
        )
    }
}

impl FromStr for SealedPayload {
    type Err = RoomKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(SEPARATOR);
        let (nonce_hex, ct_hex) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(c), None) if !n.is_empty() && !c.is_empty() => (n, c),
            _ => {
                return Err(RoomKeyError::MalformedEncoding(
                    "expected exactly two hex segments".into(),
                ))
            }
        };

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|e| RoomKeyError::MalformedEncoding(format!("nonce: {}", e)))?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes.as_slice().try_into().map_err(|_| {
            RoomKeyError::MalformedEncoding(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            ))
        })?;

        let ciphertext = hex::decode(ct_hex)
            .map_err(|e| RoomKeyError::MalformedEncoding(format!("ciphertext: {}", e)))?;
        if ciphertext.len() < TAG_LEN {
            return Err(RoomKeyError::MalformedEncoding(
                "ciphertext shorter than authentication tag".into(),
            ));
        }

        Ok(Self { nonce, ciphertext })
    }
}

impl Serialize for SealedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SealedPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
