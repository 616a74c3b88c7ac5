//! Participant passphrases
//!
//! A passphrase only lives in memory for the length of one create-room or
//! login flow. The wrapper has no `Display`, no `Serialize` and a redacted
//! `Debug`, so it cannot end up in a log line or a stored record by accident.

use secrecy::{ExposeSecret, SecretString};

use crate::crypto::{fingerprint, PassphraseFingerprint};
use crate::error::{Result, RoomKeyError};

pub struct Passphrase {
    inner: SecretString,
}

impl Passphrase {
    /// Rejects empty and whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value: String = value.into();
        if value.trim().is_empty() {
            return Err(RoomKeyError::InvalidInput("passphrase must not be empty".into()));
        }
        Ok(Self {
            inner: SecretString::from(value),
        })
    }

    /// Lookup identifier for this passphrase's participant record.
    pub fn fingerprint(&self) -> PassphraseFingerprint {
        fingerprint(self.expose_bytes())
    }

    pub(crate) fn expose_bytes(&self) -> &[u8] {
        self.inner.expose_secret().as_bytes()
    }
}

impl Clone for Passphrase {
    fn clone(&self) -> Self {
        Self {
            inner: SecretString::from(self.inner.expose_secret().to_owned()),
        }
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}
