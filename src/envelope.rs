//! Key wrapping (envelope) layer
//!
//! The room key is encrypted once per participant under a key-wrapping key
//! derived from that participant's passphrase. Every participant record
//! opens the same room key; wrapping happens once at room creation, never
//! per message.
//!
//! Records written by the original scheme carry no salt and were derived
//! with the fixed salt [`LEGACY_SALT`]. New records get a random
//! per-participant salt unless the wrapper is configured for legacy output.

use serde::{Deserialize, Serialize};

use crate::crypto::{self, fill_random, KdfParams, KeyWrappingKey, RoomKey, SealedPayload};
use crate::error::{Result, RoomKeyError};
use crate::passphrase::Passphrase;

/// Scheme-wide salt used by records that predate per-participant salts.
pub const LEGACY_SALT: &[u8] = b"master-key-salt";

/// Length of a random per-participant salt
pub const SALT_LEN: usize = 16;

/// How the KDF salt is chosen when wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaltPolicy {
    /// Fresh random salt per wrapped key, stored in the record.
    #[default]
    PerParticipant,
    /// The fixed [`LEGACY_SALT`]. Output is readable by the original clients.
    LegacyFixed,
}

/// Room key encrypted under one participant's key-wrapping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedRoomKey {
    /// `<nonce hex>:<ciphertext hex>`
    pub key: SealedPayload,
    /// Hex salt. Absent on legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default)]
    pub kdf: KdfParams,
}

impl WrappedRoomKey {
    /// A bare `nonce:ciphertext` string as stored by the original clients.
    pub fn from_legacy(encoded: &str) -> Result<Self> {
        Ok(Self {
            key: encoded.parse()?,
            salt: None,
            kdf: KdfParams::default(),
        })
    }

    pub fn is_legacy(&self) -> bool {
        self.salt.is_none()
    }

    fn salt_bytes(&self) -> Result<Vec<u8>> {
        match &self.salt {
            None => Ok(LEGACY_SALT.to_vec()),
            Some(hex_salt) => {
                let salt = hex::decode(hex_salt)
                    .map_err(|e| RoomKeyError::MalformedEncoding(format!("salt: {}", e)))?;
                if salt.is_empty() {
                    return Err(RoomKeyError::InvalidInput("salt must not be empty".into()));
                }
                Ok(salt)
            }
        }
    }
}

/// Wraps and unwraps room keys with a fixed KDF choice and salt policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyWrapper {
    kdf: KdfParams,
    salt_policy: SaltPolicy,
}

impl KeyWrapper {
    pub fn new(kdf: KdfParams, salt_policy: SaltPolicy) -> Result<Self> {
        kdf.validate()?;
        Ok(Self { kdf, salt_policy })
    }

    /// Byte-compatible with the original clients: PBKDF2/100 000 and the
    /// fixed salt.
    pub fn legacy() -> Self {
        Self {
            kdf: KdfParams::default(),
            salt_policy: SaltPolicy::LegacyFixed,
        }
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn salt_policy(&self) -> SaltPolicy {
        self.salt_policy
    }

    pub fn wrap(&self, room_key: &RoomKey, passphrase: &Passphrase) -> Result<WrappedRoomKey> {
        let (salt, stored_salt) = match self.salt_policy {
            SaltPolicy::LegacyFixed => (LEGACY_SALT.to_vec(), None),
            SaltPolicy::PerParticipant => {
                let mut salt = [0u8; SALT_LEN];
                fill_random(&mut salt)?;
                (salt.to_vec(), Some(hex::encode(salt)))
            }
        };

        let kwk = self.kdf.derive(passphrase.expose_bytes(), &salt)?;
        let key = crypto::encrypt(kwk.expose(), room_key.expose())?;

        tracing::debug!(kdf = self.kdf.name(), legacy = stored_salt.is_none(), "room key wrapped");

        Ok(WrappedRoomKey {
            key,
            salt: stored_salt,
            kdf: self.kdf,
        })
    }

    /// Unwrap with the salt and KDF recorded in `wrapped`, whatever this
    /// wrapper would use for new records.
    pub fn unwrap(&self, wrapped: &WrappedRoomKey, passphrase: &Passphrase) -> Result<RoomKey> {
        unwrap_room_key(wrapped, passphrase)
    }
}

fn derive_for(wrapped: &WrappedRoomKey, passphrase: &Passphrase) -> Result<KeyWrappingKey> {
    let salt = wrapped.salt_bytes()?;
    wrapped.kdf.derive(passphrase.expose_bytes(), &salt)
}

/// Wrap with the default scheme (PBKDF2, per-participant salt).
pub fn wrap_room_key(room_key: &RoomKey, passphrase: &Passphrase) -> Result<WrappedRoomKey> {
    KeyWrapper::default().wrap(room_key, passphrase)
}

/// Recover the room key. A wrong passphrase and a corrupted record both
/// come back as `AuthenticationFailure`.
pub fn unwrap_room_key(wrapped: &WrappedRoomKey, passphrase: &Passphrase) -> Result<RoomKey> {
    let kwk = derive_for(wrapped, passphrase)?;
    let plaintext = crypto::decrypt(kwk.expose(), &wrapped.key)?;
    RoomKey::from_slice(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(s: &str) -> Passphrase {
        Passphrase::new(s).unwrap()
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let room_key = RoomKey::generate().unwrap();
        let wrapped = wrap_room_key(&room_key, &pass("correct-horse")).unwrap();
        assert_eq!(wrapped.salt.as_ref().map(String::len), Some(SALT_LEN * 2));
        let recovered = unwrap_room_key(&wrapped, &pass("correct-horse")).unwrap();
        assert_eq!(recovered, room_key);
    }

    #[test]
    fn test_wrong_passphrase_is_authentication_failure() {
        let room_key = RoomKey::generate().unwrap();
        let wrapped = wrap_room_key(&room_key, &pass("correct-horse")).unwrap();
        let err = unwrap_room_key(&wrapped, &pass("battery-staple")).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_salts_differ_per_wrap() {
        let room_key = RoomKey::generate().unwrap();
        let a = wrap_room_key(&room_key, &pass("same")).unwrap();
        let b = wrap_room_key(&room_key, &pass("same")).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_legacy_record_unwraps() {
        let wrapped = WrappedRoomKey::from_legacy(
            "0a0a0a0a0a0a0a0a0a0a0a0a:108420814e88acdc5de3776d6c2e04c2d323df6925839f1105f01b7b1d1d35962bde408ec6c953fdb7581b09b7caa74a",
        )
        .unwrap();
        assert!(wrapped.is_legacy());
        let key = unwrap_room_key(&wrapped, &pass("correct-horse")).unwrap();
        let expected: [u8; 32] = core::array::from_fn(|i| i as u8);
        assert_eq!(key.expose(), &expected);
    }

    #[test]
    fn test_legacy_wrapper_writes_saltless_records() {
        let room_key = RoomKey::generate().unwrap();
        let wrapped = KeyWrapper::legacy().wrap(&room_key, &pass("pw")).unwrap();
        assert!(wrapped.is_legacy());
        let json = serde_json::to_value(&wrapped).unwrap();
        assert!(json.get("salt").is_none());
        assert_eq!(unwrap_room_key(&wrapped, &pass("pw")).unwrap(), room_key);
    }

    #[test]
    fn test_argon2_wrapper_roundtrip() {
        let wrapper =
            KeyWrapper::new(KdfParams::argon2id_low_memory(), SaltPolicy::PerParticipant).unwrap();
        let room_key = RoomKey::generate().unwrap();
        let wrapped = wrapper.wrap(&room_key, &pass("pw")).unwrap();
        assert_eq!(wrapped.kdf, KdfParams::argon2id_low_memory());
        assert_eq!(wrapper.unwrap(&wrapped, &pass("pw")).unwrap(), room_key);
        // Defaults never change how an existing record opens.
        assert_eq!(unwrap_room_key(&wrapped, &pass("pw")).unwrap(), room_key);
    }

    #[test]
    fn test_wrapped_non_key_plaintext_is_invalid_input() {
        let kwk = crypto::derive_key(b"pw", LEGACY_SALT, crypto::MIN_PBKDF2_ITERATIONS).unwrap();
        let wrapped = WrappedRoomKey {
            key: crypto::encrypt(kwk.expose(), b"short").unwrap(),
            salt: None,
            kdf: KdfParams::default(),
        };
        assert!(matches!(
            unwrap_room_key(&wrapped, &pass("pw")),
            Err(RoomKeyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_weak_kdf_rejected() {
        assert!(KeyWrapper::new(KdfParams::Pbkdf2Sha256 { iterations: 1 }, SaltPolicy::default())
            .is_err());
    }
}
