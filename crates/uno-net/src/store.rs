//! Player profile persistence.
//!
//! Profiles live in two places: a remote store shared by every peer and a
//! local cache that survives restarts. Writes go to both; on startup the
//! freshest copy wins. Both seams are traits so tests and local play run
//! against the in-memory versions.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use uno_core::PlayerProfile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A stored profile plus the identity fields shown to other players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub profile: PlayerProfile,
    /// Epoch milliseconds of the last write. Freshest copy wins on
    /// startup.
    pub updated_at: u64,
}

/// Shared profile store, one record per player id.
pub trait ProfileStore: Send + Sync {
    fn upsert(&self, record: &ProfileRecord) -> Result<(), StoreError>;
    fn fetch(&self, player_id: &str) -> Result<ProfileRecord, StoreError>;
}

/// Device-local cache of this peer's own record.
pub trait LocalStore: Send + Sync {
    fn save(&self, record: &ProfileRecord) -> Result<(), StoreError>;
    fn load(&self) -> Result<Option<ProfileRecord>, StoreError>;
}

/// In-memory profile store. The record boundary round-trips through JSON
/// so tests exercise the same encoding a remote backend would see.
#[derive(Default)]
pub struct MemoryProfileStore {
    records: DashMap<String, String>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn upsert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(record)?;
        self.records.insert(record.id.clone(), encoded);
        Ok(())
    }

    fn fetch(&self, player_id: &str) -> Result<ProfileRecord, StoreError> {
        let encoded = self
            .records
            .get(player_id)
            .ok_or_else(|| StoreError::NotFound(player_id.to_string()))?;
        Ok(serde_json::from_str(&encoded)?)
    }
}

/// In-memory local cache, a single slot.
#[derive(Default)]
pub struct MemoryLocalStore {
    slot: DashMap<(), String>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn save(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(record)?;
        self.slot.insert((), encoded);
        Ok(())
    }

    fn load(&self) -> Result<Option<ProfileRecord>, StoreError> {
        match self.slot.get(&()) {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }
}

/// Resolve the profile to start a session with: the fresher of the local
/// cache and the remote record, falling back to a default profile for a
/// first run. A reachable remote is then brought up to date.
pub fn bootstrap_profile(
    player_id: &str,
    name: &str,
    avatar: &str,
    remote: &dyn ProfileStore,
    local: &dyn LocalStore,
) -> ProfileRecord {
    let cached = local.load().unwrap_or_else(|err| {
        warn!(%err, "local profile cache unreadable, ignoring it");
        None
    });
    let fetched = remote.fetch(player_id).ok();

    let record = match (cached, fetched) {
        (Some(c), Some(f)) => {
            if c.updated_at >= f.updated_at {
                c
            } else {
                f
            }
        }
        (Some(c), None) => c,
        (None, Some(f)) => f,
        (None, None) => ProfileRecord {
            id: player_id.to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            profile: PlayerProfile::default(),
            updated_at: 0,
        },
    };

    if let Err(err) = remote.upsert(&record) {
        warn!(%err, "could not push profile to the shared store");
    }
    if let Err(err) = local.save(&record) {
        warn!(%err, "could not refresh the local profile cache");
    }
    record
}
