//! Room creation, login and unlocked sessions
//!
//! ```text
//! create:  RoomKey::generate ─┬─ wrap(passphrase₁) ─► ParticipantRecord₁ ─┐
//!                             ├─ wrap(passphrase₂) ─► ParticipantRecord₂ ─┼─► RoomStore
//!                             └─ ...                                      ─┘
//! login:   fingerprint(passphrase) ─► RoomStore ─► unwrap(passphrase) ─► RoomSession
//! content: RoomSession.seal/open ─► AES-256-GCM under the room key
//! ```

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::crypto::{self, RoomKey, SealedPayload};
use crate::delivery::{Delivery, DeliveryChannel};
use crate::envelope::{unwrap_room_key, KeyWrapper};
use crate::error::{Result, RoomKeyError};
use crate::passphrase::Passphrase;
use crate::store::{ArchiveItem, ArchiveKind, ParticipantRecord, Room, RoomStore, StoredMessage};

/// Shown in place of a payload that cannot be opened.
pub const DECRYPTION_FAILED_PLACEHOLDER: &str = "⚠️ Decryption failed";

/// Minimum number of participants in a room
pub const MIN_PARTICIPANTS: usize = 2;

/// A room that has not been created yet.
#[derive(Debug, Clone)]
pub struct RoomDraft {
    name: String,
    participants: Vec<(String, Passphrase)>,
}

impl RoomDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: Vec::new(),
        }
    }

    /// The first participant added is the creator.
    pub fn participant(mut self, display_name: impl Into<String>, passphrase: Passphrase) -> Self {
        self.participants.push((display_name.into(), passphrase));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RoomKeyError::InvalidInput("room name must not be empty".into()));
        }
        if self.participants.len() < MIN_PARTICIPANTS {
            return Err(RoomKeyError::InvalidInput(format!(
                "a room needs at least {} participants",
                MIN_PARTICIPANTS
            )));
        }
        if self.participants.iter().any(|(name, _)| name.trim().is_empty()) {
            return Err(RoomKeyError::InvalidInput("display name must not be empty".into()));
        }

        let mut seen = HashSet::new();
        if !self.participants.iter().all(|(_, p)| seen.insert(p.fingerprint())) {
            return Err(RoomKeyError::InvalidInput(
                "participants of one room need distinct passphrases".into(),
            ));
        }
        Ok(())
    }

    /// Generate the room key, wrap it once per participant, persist the
    /// room and its participant records, and unlock a session for the
    /// creator.
    pub fn create(self, store: &dyn RoomStore, wrapper: &KeyWrapper) -> Result<RoomSession> {
        self.validate()?;

        let room = Room {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            created_at: Utc::now(),
        };
        let room_key = RoomKey::generate()?;

        let records = self
            .participants
            .iter()
            .map(|(display_name, passphrase)| {
                Ok(ParticipantRecord {
                    room_id: room.id,
                    display_name: display_name.trim().to_string(),
                    fingerprint: passphrase.fingerprint(),
                    wrapped_key: wrapper.wrap(&room_key, passphrase)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        store.create_room(&room, &records)?;

        tracing::info!(
            room_id = %room.id,
            participants = records.len(),
            kdf = wrapper.kdf().name(),
            "room created"
        );

        Ok(RoomSession {
            room_id: room.id,
            room_name: room.name,
            display_name: records[0].display_name.clone(),
            room_key,
        })
    }
}

/// Find the participant record for `passphrase` and unlock its room.
///
/// Unknown passphrase, wrong passphrase and a corrupted record all return
/// `AuthenticationFailure`.
pub fn login(store: &dyn RoomStore, passphrase: &Passphrase) -> Result<RoomSession> {
    let fp = passphrase.fingerprint();
    let candidates = store.participants_by_fingerprint(&fp)?;

    for record in candidates {
        match unwrap_room_key(&record.wrapped_key, passphrase) {
            Ok(room_key) => {
                let room_name = store
                    .room(record.room_id)?
                    .map(|r| r.name)
                    .ok_or_else(|| {
                        RoomKeyError::Storage(format!(
                            "participant record points at missing room {}",
                            record.room_id
                        ))
                    })?;
                tracing::info!(room_id = %record.room_id, fingerprint = fp.short(), "login succeeded");
                return Ok(RoomSession {
                    room_id: record.room_id,
                    room_name,
                    display_name: record.display_name,
                    room_key,
                });
            }
            Err(e) => {
                tracing::debug!(room_id = %record.room_id, error = %e, "candidate record did not unwrap");
            }
        }
    }

    tracing::warn!("login failed");
    Err(RoomKeyError::AuthenticationFailure)
}

/// A participant's unlocked view of one room.
#[derive(Debug, Clone)]
pub struct RoomSession {
    room_id: Uuid,
    room_name: String,
    display_name: String,
    room_key: RoomKey,
}

impl RoomSession {
    /// Session for a room key obtained some other way.
    pub fn new(room_id: Uuid, room_name: String, display_name: String, room_key: RoomKey) -> Self {
        Self {
            room_id,
            room_name,
            display_name,
            room_key,
        }
    }

    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn room_key(&self) -> &RoomKey {
        &self.room_key
    }

    pub fn seal(&self, text: &str) -> Result<SealedPayload> {
        let sealed = crypto::encrypt_text(self.room_key.expose(), text)?;
        tracing::trace!(room_id = %self.room_id, bytes = sealed.ciphertext().len(), "payload sealed");
        Ok(sealed)
    }

    pub fn open(&self, sealed: &SealedPayload) -> Result<String> {
        crypto::decrypt_text(self.room_key.expose(), sealed)
    }

    /// Plaintext, or [`DECRYPTION_FAILED_PLACEHOLDER`] if it cannot be opened.
    pub fn open_for_display(&self, sealed: &SealedPayload) -> String {
        self.open(sealed).unwrap_or_else(|e| {
            tracing::debug!(room_id = %self.room_id, error = %e, "payload did not open");
            DECRYPTION_FAILED_PLACEHOLDER.to_string()
        })
    }

    /// Seal once, store, then hand the same ciphertext to delivery.
    pub fn post_message(
        &self,
        store: &dyn RoomStore,
        delivery: &dyn DeliveryChannel,
        text: &str,
    ) -> Result<StoredMessage> {
        if text.trim().is_empty() {
            return Err(RoomKeyError::InvalidInput("message must not be empty".into()));
        }

        let message = StoredMessage {
            id: Uuid::new_v4(),
            room_id: self.room_id,
            sender_name: self.display_name.clone(),
            content: self.seal(text)?,
            created_at: Utc::now(),
        };
        store.append_message(&message)?;
        delivery.deliver(&Delivery {
            room_id: self.room_id,
            sender: self.display_name.clone(),
            payload: message.content.clone(),
        })?;

        tracing::debug!(room_id = %self.room_id, message_id = %message.id, "message posted");
        Ok(message)
    }

    /// Room history, oldest first, as `(sender, text)` pairs.
    pub fn history(&self, store: &dyn RoomStore) -> Result<Vec<(String, String)>> {
        Ok(store
            .messages(self.room_id)?
            .into_iter()
            .map(|m| {
                let text = self.open_for_display(&m.content);
                (m.sender_name, text)
            })
            .collect())
    }

    pub fn clear_history(&self, store: &dyn RoomStore) -> Result<usize> {
        let removed = store.clear_messages(self.room_id)?;
        tracing::info!(room_id = %self.room_id, removed, "history cleared");
        Ok(removed)
    }

    pub fn add_archive(
        &self,
        store: &dyn RoomStore,
        content: &str,
        tag: Option<&str>,
    ) -> Result<ArchiveItem> {
        if content.trim().is_empty() {
            return Err(RoomKeyError::InvalidInput("archive content must not be empty".into()));
        }

        let item = ArchiveItem {
            id: Uuid::new_v4(),
            room_id: self.room_id,
            created_by: self.display_name.clone(),
            kind: ArchiveKind::infer(content, tag),
            content: self.seal(content)?,
            tags: tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
            created_at: Utc::now(),
        };
        store.insert_archive(&item)?;
        Ok(item)
    }

    /// Archive entries, newest first, with their content opened.
    pub fn archives(&self, store: &dyn RoomStore) -> Result<Vec<(ArchiveItem, String)>> {
        Ok(store
            .archives(self.room_id)?
            .into_iter()
            .map(|item| {
                let text = self.open_for_display(&item.content);
                (item, text)
            })
            .collect())
    }

    pub fn remove_archive(&self, store: &dyn RoomStore, id: Uuid) -> Result<bool> {
        store.delete_archive(self.room_id, id)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::{json, Value};

    use super::*;
    use crate::delivery::NoDelivery;
    use crate::store::{FileStore, MemoryStore};

    fn pass(s: &str) -> Passphrase {
        Passphrase::new(s).unwrap()
    }

    fn two_person_room(store: &dyn RoomStore) -> RoomSession {
        RoomDraft::new("Home")
            .participant("Alice", pass("correct-horse"))
            .participant("Bob", pass("battery-staple"))
            .create(store, &KeyWrapper::default())
            .unwrap()
    }

    /// Create the two-person room in a file store, then edit the JSON on disk.
    fn edited_file_store(path: &Path, edit: impl FnOnce(&mut Value)) -> FileStore {
        two_person_room(&FileStore::open(path).unwrap());

        let mut doc: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        edit(&mut doc);
        std::fs::write(path, serde_json::to_vec(&doc).unwrap()).unwrap();
        FileStore::open(path).unwrap()
    }

    fn record_of<'a>(doc: &'a mut Value, name: &str) -> &'a mut Value {
        doc["participants"]
            .as_array_mut()
            .unwrap()
            .iter_mut()
            .find(|p| p["display_name"] == name)
            .unwrap()
    }

    #[test]
    fn test_create_returns_creator_session() {
        let store = MemoryStore::new();
        let session = two_person_room(&store);
        assert_eq!(session.display_name(), "Alice");
        assert_eq!(session.room_name(), "Home");
        assert!(store.room(session.room_id()).unwrap().is_some());
    }

    #[test]
    fn test_create_validation() {
        let store = MemoryStore::new();
        let wrapper = KeyWrapper::default();

        let one = RoomDraft::new("Solo").participant("Alice", pass("a"));
        assert!(matches!(one.create(&store, &wrapper), Err(RoomKeyError::InvalidInput(_))));

        let unnamed = RoomDraft::new(" ")
            .participant("Alice", pass("a"))
            .participant("Bob", pass("b"));
        assert!(matches!(unnamed.create(&store, &wrapper), Err(RoomKeyError::InvalidInput(_))));

        let blank_member = RoomDraft::new("Home")
            .participant("Alice", pass("a"))
            .participant("", pass("b"));
        assert!(matches!(
            blank_member.create(&store, &wrapper),
            Err(RoomKeyError::InvalidInput(_))
        ));

        let shared = RoomDraft::new("Home")
            .participant("Alice", pass("same"))
            .participant("Bob", pass("same"));
        assert!(matches!(shared.create(&store, &wrapper), Err(RoomKeyError::InvalidInput(_))));
    }

    #[test]
    fn test_both_participants_log_into_same_room() {
        let store = MemoryStore::new();
        let created = two_person_room(&store);

        let bob = login(&store, &pass("battery-staple")).unwrap();
        assert_eq!(bob.display_name(), "Bob");
        assert_eq!(bob.room_id(), created.room_id());
        assert_eq!(bob.room_key(), created.room_key());
    }

    #[test]
    fn test_unknown_passphrase_is_authentication_failure() {
        let store = MemoryStore::new();
        two_person_room(&store);

        let unknown = login(&store, &pass("nobody")).unwrap_err();
        assert!(unknown.is_authentication_failure());
        assert_eq!(unknown.user_message(), crate::error::INVALID_PASSPHRASE);
    }

    #[test]
    fn test_corrupted_record_looks_like_unknown_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let store = edited_file_store(&dir.path().join("aura.json"), |doc| {
            let key = &mut record_of(doc, "Alice")["wrapped_key"]["key"];
            let mut wire = key.as_str().unwrap().to_string();
            let last = if wire.ends_with('0') { "1" } else { "0" };
            wire.replace_range(wire.len() - 1.., last);
            *key = Value::String(wire);
        });

        let corrupted = login(&store, &pass("correct-horse")).unwrap_err();
        let unknown = login(&store, &pass("nobody")).unwrap_err();
        assert!(corrupted.is_authentication_failure());
        assert_eq!(corrupted.user_message(), unknown.user_message());

        assert_eq!(login(&store, &pass("battery-staple")).unwrap().display_name(), "Bob");
    }

    #[test]
    fn test_out_of_range_kdf_in_record_fails_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = edited_file_store(&dir.path().join("aura.json"), |doc| {
            record_of(doc, "Alice")["wrapped_key"]["kdf"] = json!({
                "algorithm": "argon2id",
                "memory_kib": u32::MAX,
                "time_cost": 3,
                "parallelism": 1
            });
            record_of(doc, "Bob")["wrapped_key"]["kdf"] = json!({
                "algorithm": "pbkdf2-sha256",
                "iterations": u32::MAX
            });
        });

        for passphrase in ["correct-horse", "battery-staple"] {
            let err = login(&store, &pass(passphrase)).unwrap_err();
            assert!(matches!(err, RoomKeyError::AuthenticationFailure));
            assert_eq!(err.user_message(), crate::error::INVALID_PASSPHRASE);
        }
    }

    #[test]
    fn test_record_without_room_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = edited_file_store(&dir.path().join("aura.json"), |doc| {
            doc["rooms"] = json!({});
        });

        assert!(matches!(
            login(&store, &pass("battery-staple")),
            Err(RoomKeyError::Storage(_))
        ));
    }

    #[test]
    fn test_failed_create_leaves_no_room_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = FileStore::open(blocker.join("aura.json")).unwrap();

        let err = RoomDraft::new("Home")
            .participant("Alice", pass("correct-horse"))
            .participant("Bob", pass("battery-staple"))
            .create(&store, &KeyWrapper::default())
            .unwrap_err();
        assert!(!err.is_recoverable());

        assert!(store
            .participants_by_fingerprint(&pass("correct-horse").fingerprint())
            .unwrap()
            .is_empty());
        assert!(login(&store, &pass("correct-horse")).unwrap_err().is_authentication_failure());
    }

    #[test]
    fn test_messages_flow_between_participants() {
        let store = MemoryStore::new();
        let alice = two_person_room(&store);
        let bob = login(&store, &pass("battery-staple")).unwrap();

        alice.post_message(&store, &NoDelivery, "hello").unwrap();
        bob.post_message(&store, &NoDelivery, "hi alice").unwrap();
        assert!(alice.post_message(&store, &NoDelivery, "  ").is_err());

        let history = bob.history(&store).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ("Alice".to_string(), "hello".to_string()));
        assert_eq!(history[1].1, "hi alice");

        assert_eq!(alice.clear_history(&store).unwrap(), 2);
        assert!(bob.history(&store).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_key_shows_placeholder() {
        let store = MemoryStore::new();
        let alice = two_person_room(&store);
        let stranger = RoomSession::new(
            alice.room_id(),
            "Home".into(),
            "Mallory".into(),
            RoomKey::generate().unwrap(),
        );
        let sealed = alice.seal("hello").unwrap();
        assert_eq!(stranger.open_for_display(&sealed), DECRYPTION_FAILED_PLACEHOLDER);
        assert!(stranger.open(&sealed).unwrap_err().is_authentication_failure());
    }

    #[test]
    fn test_archive_lifecycle() {
        let store = MemoryStore::new();
        let alice = two_person_room(&store);

        let link = alice.add_archive(&store, "https://example.org", None).unwrap();
        assert_eq!(link.kind, ArchiveKind::Link);
        let photo = alice.add_archive(&store, "beach.jpg", Some("Photo")).unwrap();
        assert_eq!(photo.tags, vec!["Photo".to_string()]);

        let listed = alice.archives(&store).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|(_, text)| text == "https://example.org"));

        assert!(alice.remove_archive(&store, link.id).unwrap());
        assert!(!alice.remove_archive(&store, link.id).unwrap());
        assert_eq!(alice.archives(&store).unwrap().len(), 1);
    }
}
