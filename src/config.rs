//! Scheme configuration
//!
//! Stored as JSON. Every field has a default, so an empty object `{}` is a
//! valid configuration equal to [`SchemeConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::envelope::{KeyWrapper, SaltPolicy};
use crate::error::{Result, RoomKeyError};

/// File name of the default store inside the data directory
pub const DEFAULT_STORE_FILE: &str = "aura-store.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// KDF used for newly wrapped room keys
    pub kdf: KdfParams,
    /// Salt choice for newly wrapped room keys
    pub salt_policy: SaltPolicy,
    /// Store location; [`default_store_path`] when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl SchemeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: SchemeConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.kdf.validate()
    }

    pub fn wrapper(&self) -> Result<KeyWrapper> {
        KeyWrapper::new(self.kdf, self.salt_policy)
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => default_store_path(),
        }
    }
}

/// `<data dir>/aura/aura-store.json`
pub fn default_store_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("aura").join(DEFAULT_STORE_FILE))
        .ok_or_else(|| RoomKeyError::Storage("no data directory on this platform".into()))
}
