//! Passphrase fingerprint - SHA-256 lookup identifier
//!
//! Known weakness: the fingerprint is a single fast hash over the same
//! secret that feeds the slow KDF. Anyone who can read stored fingerprints
//! can run a dictionary attack against them directly and skip the KDF
//! cost. Fingerprinting stays a separate function so a slower hash or a
//! server-side rate limit can replace it without touching key wrapping.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::RoomKeyError;

/// Hex length of a SHA-256 digest
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Stable, non-secret index value for a participant record. Not key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassphraseFingerprint(String);

impl PassphraseFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl std::fmt::Display for PassphraseFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PassphraseFingerprint {
    type Err = RoomKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != FINGERPRINT_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RoomKeyError::MalformedEncoding(format!(
                "fingerprint must be {} hex characters",
                FINGERPRINT_HEX_LEN
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl Serialize for PassphraseFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PassphraseFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// SHA-256 of the passphrase bytes, lowercase hex.
pub fn fingerprint(passphrase: &[u8]) -> PassphraseFingerprint {
    let digest = Sha256::digest(passphrase);
    PassphraseFingerprint(hex::encode(digest))
}
