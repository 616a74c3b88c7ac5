//! Passphrase KDF - PBKDF2-HMAC-SHA256 and Argon2id
//!
//! PBKDF2 with 100 000 rounds is what every existing record was written
//! with, so it stays the default. Argon2id is available for new rooms that
//! want memory hardness. Both are slow on purpose.

use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::keys::{KeyWrappingKey, KEY_LEN};
use crate::error::{Result, RoomKeyError};

/// Floor for PBKDF2 rounds. Raising is fine, lowering is not.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Ceiling for PBKDF2 rounds. Stored records carry their own parameters.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Floor for Argon2id memory cost (KiB)
pub const MIN_ARGON2_MEMORY_KIB: u32 = 16 * 1024;

/// Ceiling for Argon2id memory cost (KiB), 1 GiB
pub const MAX_ARGON2_MEMORY_KIB: u32 = 1024 * 1024;

/// Ceiling for Argon2id passes
pub const MAX_ARGON2_TIME_COST: u32 = 16;

/// Ceiling for Argon2id lanes
pub const MAX_ARGON2_PARALLELISM: u32 = 16;

/// Derive a 256-bit key-wrapping key with PBKDF2-HMAC-SHA256.
pub fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> Result<KeyWrappingKey> {
    check_inputs(passphrase, salt)?;
    check_iterations(iterations)?;

    let mut output = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut output);
    Ok(KeyWrappingKey::from_bytes(output))
}

fn derive_key_argon2(
    passphrase: &[u8],
    salt: &[u8],
    memory_kib: u32,
    time_cost: u32,
    parallelism: u32,
) -> Result<KeyWrappingKey> {
    check_inputs(passphrase, salt)?;

    let params = Params::new(memory_kib, time_cost, parallelism, Some(KEY_LEN))
        .map_err(|e| RoomKeyError::InvalidInput(format!("Invalid Argon2 params: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut output)
        .map_err(|e| RoomKeyError::InvalidInput(format!("Argon2 derivation failed: {}", e)))?;
    Ok(KeyWrappingKey::from_bytes(output))
}

fn check_iterations(iterations: u32) -> Result<()> {
    if !(MIN_PBKDF2_ITERATIONS..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
        return Err(RoomKeyError::InvalidInput(format!(
            "PBKDF2 iterations must be within {}..={}, got {}",
            MIN_PBKDF2_ITERATIONS, MAX_PBKDF2_ITERATIONS, iterations
        )));
    }
    Ok(())
}

fn check_inputs(passphrase: &[u8], salt: &[u8]) -> Result<()> {
    if passphrase.is_empty() {
        return Err(RoomKeyError::InvalidInput("passphrase must not be empty".into()));
    }
    if salt.is_empty() {
        return Err(RoomKeyError::InvalidInput("salt must not be empty".into()));
    }
    Ok(())
}

/// KDF choice recorded next to every wrapped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    Pbkdf2Sha256 {
        iterations: u32,
    },
    Argon2id {
        memory_kib: u32,
        time_cost: u32,
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn argon2id() -> Self {
        Self::Argon2id {
            memory_kib: 64 * 1024, // 64 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Preset for low-memory devices
    pub fn argon2id_low_memory() -> Self {
        Self::Argon2id {
            memory_kib: MIN_ARGON2_MEMORY_KIB,
            time_cost: 4,
            parallelism: 1,
        }
    }

    pub fn argon2id_high_security() -> Self {
        Self::Argon2id {
            memory_kib: 256 * 1024,
            time_cost: 4,
            parallelism: 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "PBKDF2-HMAC-SHA256",
            Self::Argon2id { .. } => "Argon2id",
        }
    }

    /// Bounds-check the parameters. Applied to every stored record before
    /// any derivation runs.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } => check_iterations(iterations),
            Self::Argon2id {
                memory_kib,
                time_cost,
                parallelism,
            } => {
                if !(MIN_ARGON2_MEMORY_KIB..=MAX_ARGON2_MEMORY_KIB).contains(&memory_kib) {
                    return Err(RoomKeyError::InvalidInput(format!(
                        "Argon2id memory must be within {}..={} KiB, got {}",
                        MIN_ARGON2_MEMORY_KIB, MAX_ARGON2_MEMORY_KIB, memory_kib
                    )));
                }
                if !(1..=MAX_ARGON2_TIME_COST).contains(&time_cost) {
                    return Err(RoomKeyError::InvalidInput(format!(
                        "Argon2id time cost must be within 1..={}, got {}",
                        MAX_ARGON2_TIME_COST, time_cost
                    )));
                }
                if !(1..=MAX_ARGON2_PARALLELISM).contains(&parallelism) {
                    return Err(RoomKeyError::InvalidInput(format!(
                        "Argon2id parallelism must be within 1..={}, got {}",
                        MAX_ARGON2_PARALLELISM, parallelism
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn derive(&self, passphrase: &[u8], salt: &[u8]) -> Result<KeyWrappingKey> {
        self.validate()?;
        match *self {
            Self::Pbkdf2Sha256 { iterations } => derive_key(passphrase, salt, iterations),
            Self::Argon2id {
                memory_kib,
                time_cost,
                parallelism,
            } => derive_key_argon2(passphrase, salt, memory_kib, time_cost, parallelism),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let kwk = derive_key(b"correct-horse", b"master-key-salt", 100_000).unwrap();
        assert_eq!(
            hex::encode(kwk.expose()),
            "9081aa4578634866c47a44c181d9a87bf82db77391c54edcf861c75879ef315b"
        );
    }

    #[test]
    fn test_deterministic_and_salt_sensitive() {
        let a = derive_key(b"pw", b"salt-one", MIN_PBKDF2_ITERATIONS).unwrap();
        let b = derive_key(b"pw", b"salt-one", MIN_PBKDF2_ITERATIONS).unwrap();
        let c = derive_key(b"pw", b"salt-two", MIN_PBKDF2_ITERATIONS).unwrap();
        assert_eq!(a.expose(), b.expose());
        assert_ne!(a.expose(), c.expose());
    }

    #[test]
    fn test_rejects_empty_inputs_and_low_iterations() {
        assert!(matches!(
            derive_key(b"", b"salt", MIN_PBKDF2_ITERATIONS),
            Err(RoomKeyError::InvalidInput(_))
        ));
        assert!(matches!(
            derive_key(b"pw", b"", MIN_PBKDF2_ITERATIONS),
            Err(RoomKeyError::InvalidInput(_))
        ));
        assert!(matches!(
            derive_key(b"pw", b"salt", 1_000),
            Err(RoomKeyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_argon2_deterministic() {
        let params = KdfParams::argon2id_low_memory();
        let a = params.derive(b"pw", &[1u8; 16]).unwrap();
        let b = params.derive(b"pw", &[1u8; 16]).unwrap();
        assert_eq!(a.expose(), b.expose());
        assert_ne!(a.expose(), derive_key(b"pw", &[1u8; 16], MIN_PBKDF2_ITERATIONS).unwrap().expose());
    }

    #[test]
    fn test_validate_floors() {
        assert!(KdfParams::default().validate().is_ok());
        assert!(KdfParams::argon2id().validate().is_ok());
        assert!(KdfParams::Pbkdf2Sha256 { iterations: 10 }.validate().is_err());
        assert!(KdfParams::Argon2id {
            memory_kib: 1024,
            time_cost: 1,
            parallelism: 1
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_validate_ceilings() {
        assert!(KdfParams::argon2id_high_security().validate().is_ok());
        assert!(KdfParams::Pbkdf2Sha256 { iterations: MAX_PBKDF2_ITERATIONS }.validate().is_ok());
        assert!(matches!(
            KdfParams::Pbkdf2Sha256 { iterations: u32::MAX }.validate(),
            Err(RoomKeyError::InvalidInput(_))
        ));

        let huge = [
            (u32::MAX, 3, 1),
            (MAX_ARGON2_MEMORY_KIB + 1, 3, 1),
            (MIN_ARGON2_MEMORY_KIB, u32::MAX, 1),
            (MIN_ARGON2_MEMORY_KIB, 3, MAX_ARGON2_PARALLELISM + 1),
            (MIN_ARGON2_MEMORY_KIB, 0, 1),
        ];
        for (memory_kib, time_cost, parallelism) in huge {
            let params = KdfParams::Argon2id {
                memory_kib,
                time_cost,
                parallelism,
            };
            assert!(matches!(params.validate(), Err(RoomKeyError::InvalidInput(_))));
            // Rejected before any memory is allocated
            assert!(matches!(params.derive(b"pw", b"salt"), Err(RoomKeyError::InvalidInput(_))));
        }

        assert!(matches!(
            derive_key(b"pw", b"salt", u32::MAX),
            Err(RoomKeyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&KdfParams::default()).unwrap();
        assert_eq!(json, r#"{"algorithm":"pbkdf2-sha256","iterations":100000}"#);
        let back: KdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KdfParams::default());
    }
}
