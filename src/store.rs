//! Persistence collaborator
//!
//! The store only ever sees fingerprints, wrapped room keys, display names
//! and sealed payloads. It is handed those shapes and must give them back
//! unchanged.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{PassphraseFingerprint, SealedPayload};
use crate::envelope::WrappedRoomKey;
use crate::error::{Result, RoomKeyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One participant of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub room_id: Uuid,
    pub display_name: String,
    pub fingerprint: PassphraseFingerprint,
    pub wrapped_key: WrappedRoomKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_name: String,
    pub content: SealedPayload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Link,
    Photo,
    Note,
}

impl ArchiveKind {
    /// `Photo` tag wins, then `Link` tag or an `http` prefix, else `Note`.
    pub fn infer(content: &str, tag: Option<&str>) -> Self {
        match tag {
            Some("Photo") => Self::Photo,
            Some("Link") => Self::Link,
            _ if content.starts_with("http") => Self::Link,
            _ => Self::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveItem {
    pub id: Uuid,
    pub room_id: Uuid,
    pub created_by: String,
    pub kind: ArchiveKind,
    pub content: SealedPayload,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Storage backend for rooms, participants and sealed content.
pub trait RoomStore: Send + Sync {
    /// Store a new room together with its participant records. Either
    /// everything is written or nothing is.
    fn create_room(&self, room: &Room, participants: &[ParticipantRecord]) -> Result<()>;

    fn room(&self, id: Uuid) -> Result<Option<Room>>;

    /// Every record carrying `fingerprint`, across all rooms.
    fn participants_by_fingerprint(
        &self,
        fingerprint: &PassphraseFingerprint,
    ) -> Result<Vec<ParticipantRecord>>;

    fn append_message(&self, message: &StoredMessage) -> Result<()>;

    /// Oldest first.
    fn messages(&self, room_id: Uuid) -> Result<Vec<StoredMessage>>;

    /// Returns how many messages were removed.
    fn clear_messages(&self, room_id: Uuid) -> Result<usize>;

    fn insert_archive(&self, item: &ArchiveItem) -> Result<()>;

    /// Newest first.
    fn archives(&self, room_id: Uuid) -> Result<Vec<ArchiveItem>>;

    /// Returns whether an item was removed.
    fn delete_archive(&self, room_id: Uuid, id: Uuid) -> Result<bool>;
}

/// Full contents of a store. Also the on-disk JSON document of [`FileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    rooms: HashMap<Uuid, Room>,
    #[serde(default)]
    participants: Vec<ParticipantRecord>,
    #[serde(default)]
    messages: Vec<StoredMessage>,
    #[serde(default)]
    archives: Vec<ArchiveItem>,
}

impl StoreData {
    fn create_room(&mut self, room: &Room, records: &[ParticipantRecord]) -> Result<()> {
        if self.rooms.contains_key(&room.id) {
            return Err(RoomKeyError::Storage(format!("room {} already exists", room.id)));
        }
        if records.is_empty() {
            return Err(RoomKeyError::Storage(format!("room {} has no participants", room.id)));
        }
        if let Some(stray) = records.iter().find(|r| r.room_id != room.id) {
            return Err(RoomKeyError::Storage(format!(
                "participant record for room {} passed with room {}",
                stray.room_id, room.id
            )));
        }
        self.rooms.insert(room.id, room.clone());
        self.participants.extend_from_slice(records);
        Ok(())
    }

    fn participants_by_fingerprint(&self, fp: &PassphraseFingerprint) -> Vec<ParticipantRecord> {
        self.participants
            .iter()
            .filter(|p| &p.fingerprint == fp)
            .cloned()
            .collect()
    }

    fn messages(&self, room_id: Uuid) -> Vec<StoredMessage> {
        let mut out: Vec<_> = self
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        out
    }

    fn clear_messages(&mut self, room_id: Uuid) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| m.room_id != room_id);
        before - self.messages.len()
    }

    fn archives(&self, room_id: Uuid) -> Vec<ArchiveItem> {
        let mut out: Vec<_> = self
            .archives
            .iter()
            .filter(|a| a.room_id == room_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    fn delete_archive(&mut self, room_id: Uuid, id: Uuid) -> bool {
        let before = self.archives.len();
        self.archives.retain(|a| !(a.room_id == room_id && a.id == id));
        before != self.archives.len()
    }
}

/// In-process store for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn create_room(&self, room: &Room, participants: &[ParticipantRecord]) -> Result<()> {
        self.data.write().create_room(room, participants)
    }

    fn room(&self, id: Uuid) -> Result<Option<Room>> {
        Ok(self.data.read().rooms.get(&id).cloned())
    }

    fn participants_by_fingerprint(
        &self,
        fingerprint: &PassphraseFingerprint,
    ) -> Result<Vec<ParticipantRecord>> {
        Ok(self.data.read().participants_by_fingerprint(fingerprint))
    }

    fn append_message(&self, message: &StoredMessage) -> Result<()> {
        self.data.write().messages.push(message.clone());
        Ok(())
    }

    fn messages(&self, room_id: Uuid) -> Result<Vec<StoredMessage>> {
        Ok(self.data.read().messages(room_id))
    }

    fn clear_messages(&self, room_id: Uuid) -> Result<usize> {
        Ok(self.data.write().clear_messages(room_id))
    }

    fn insert_archive(&self, item: &ArchiveItem) -> Result<()> {
        self.data.write().archives.push(item.clone());
        Ok(())
    }

    fn archives(&self, room_id: Uuid) -> Result<Vec<ArchiveItem>> {
        Ok(self.data.read().archives(room_id))
    }

    fn delete_archive(&self, room_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(self.data.write().delete_archive(room_id, id))
    }
}

/// Single JSON document on disk, rewritten atomically on every change.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl FileStore {
    /// Open `path`, or start empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            StoreData::default()
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and persist. Nothing is kept in memory if the write fails.
    fn mutate<T>(&self, change: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut guard = self.data.write();
        let mut next = guard.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(data)?;
        let temp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;

        // Rename is atomic on the same filesystem
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl RoomStore for FileStore {
    fn create_room(&self, room: &Room, participants: &[ParticipantRecord]) -> Result<()> {
        self.mutate(|d| d.create_room(room, participants))
    }

    fn room(&self, id: Uuid) -> Result<Option<Room>> {
        Ok(self.data.read().rooms.get(&id).cloned())
    }

    fn participants_by_fingerprint(
        &self,
        fingerprint: &PassphraseFingerprint,
    ) -> Result<Vec<ParticipantRecord>> {
        Ok(self.data.read().participants_by_fingerprint(fingerprint))
    }

    fn append_message(&self, message: &StoredMessage) -> Result<()> {
        self.mutate(|d| {
            d.messages.push(message.clone());
            Ok(())
        })
    }

    fn messages(&self, room_id: Uuid) -> Result<Vec<StoredMessage>> {
        Ok(self.data.read().messages(room_id))
    }

    fn clear_messages(&self, room_id: Uuid) -> Result<usize> {
        self.mutate(|d| Ok(d.clear_messages(room_id)))
    }

    fn insert_archive(&self, item: &ArchiveItem) -> Result<()> {
        self.mutate(|d| {
            d.archives.push(item.clone());
            Ok(())
        })
    }

    fn archives(&self, room_id: Uuid) -> Result<Vec<ArchiveItem>> {
        Ok(self.data.read().archives(room_id))
    }

    fn delete_archive(&self, room_id: Uuid, id: Uuid) -> Result<bool> {
        self.mutate(|d| Ok(d.delete_archive(room_id, id)))
    }
}
