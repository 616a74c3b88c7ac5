//! Error types for aura-envelope

use thiserror::Error;

/// User-facing text for any credential failure.
pub const INVALID_PASSPHRASE: &str = "Invalid passphrase";

/// User-facing text for any payload that cannot be opened.
pub const COULD_NOT_DECRYPT: &str = "Could not decrypt";

#[derive(Debug, Error)]
pub enum RoomKeyError {
    /// Malformed key, passphrase, salt or KDF parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// AEAD tag mismatch. Covers wrong passphrase, wrong key and tampered
    /// data alike; callers must not try to tell these apart.
    #[error("Authentication failed - wrong passphrase or corrupted data")]
    AuthenticationFailure,

    /// Wire format is not `<nonce hex>:<ciphertext hex>`.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Random source failed: {0}")]
    RandomSource(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task interrupted: {0}")]
    Interrupted(String),
}

pub type Result<T> = std::result::Result<T, RoomKeyError>;

impl RoomKeyError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailure)
    }

    /// Errors the caller can retry or report without tearing anything down.
    /// Only collaborator faults (disk, store) fall outside this set.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::AuthenticationFailure
                | Self::MalformedEncoding(_)
                | Self::Interrupted(_)
                | Self::RandomSource(_)
        )
    }

    /// Message safe to show an end user. Login and decryption failures
    /// collapse to one string each so the cause never leaks.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => INVALID_PASSPHRASE,
            Self::MalformedEncoding(_) => COULD_NOT_DECRYPT,
            Self::InvalidInput(_) => "Invalid input",
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => "Storage unavailable",
            Self::Interrupted(_) | Self::RandomSource(_) => "Operation interrupted",
        }
    }
}
