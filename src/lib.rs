//! # Aura Envelope
//!
//! Passphrase-unlocked envelope encryption for shared chat rooms.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        ROOM FLOWS                         │
//! │      RoomDraft::create  ·  login  ·  RoomSession          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                 ENVELOPE (KeyWrapper)               │  │
//! │  │   passphrase ─► KDF ─► KWK ─► AES-GCM(room key)     │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐  │
//! │  │ PBKDF2 /     │ │ SHA-256      │ │ AES-256-GCM      │  │
//! │  │ Argon2id KDF │ │ fingerprint  │ │ nonce:ciphertext │  │
//! │  └──────────────┘ └──────────────┘ └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//!        │ fingerprints, wrapped keys,        │ sealed payloads
//!        ▼ sealed payloads                    ▼
//!    RoomStore                          DeliveryChannel
//! ```
//!
//! ## Security Model
//!
//! - One random 256-bit room key per room, encrypting all content
//! - Room key wrapped once per participant under a passphrase-derived key
//! - Fresh random nonce for every encryption
//! - Passphrases, room keys and wrapping keys never leave process memory
//! - A lost passphrase cannot be recovered: there is no reset path

pub mod config;
pub mod crypto;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod passphrase;
pub mod room;
pub mod store;
pub mod tasks;

pub use config::SchemeConfig;
pub use crypto::{fingerprint, PassphraseFingerprint, RoomKey, SealedPayload};
pub use delivery::{BroadcastDelivery, Delivery, DeliveryChannel, NoDelivery};
pub use envelope::{unwrap_room_key, wrap_room_key, KeyWrapper, SaltPolicy, WrappedRoomKey};
pub use error::{Result, RoomKeyError};
pub use passphrase::Passphrase;
pub use room::{login, RoomDraft, RoomSession};
pub use store::{FileStore, MemoryStore, RoomStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
