//! Progress persistence layer.
//!
//! A thin sled-backed key/value store holding the serialized mirror of the in-memory
//! [`Progress`](crate::quest::progress::Progress) state. The store is read once at
//! session start and written after every mutation. It is deliberately forgiving:
//! a corrupt or unreadable value loads as "no prior progress" and a failed write is
//! the caller's problem to log, never a crash.
//!
//! Keys are namespaced under `quest:` so the tree can coexist with unrelated data.

use std::path::{Path, PathBuf};

use log::warn;
use sled::IVec;
use thiserror::Error;

const TREE_PROGRESS: &str = "quest_progress";

/// Namespaced keys for each persisted field. One key per field keeps single-field
/// updates cheap and makes partial corruption recoverable field by field.
pub const KEY_COMPLETED: &str = "quest:completed-locations";
pub const KEY_COLLECTED: &str = "quest:collected-items";
pub const KEY_HINTS_USED: &str = "quest:hints-used";
pub const KEY_CURRENT_LOCATION: &str = "quest:current-location";
pub const KEY_GAME_STARTED: &str = "quest:game-started";

/// Errors that can arise while interacting with the progress store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ProgressStoreBuilder {
    path: PathBuf,
}

impl ProgressStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<ProgressStore, StoreError> {
        ProgressStore::open(self.path)
    }
}

/// Sled-backed persistence for quest progress.
pub struct ProgressStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl ProgressStore {
    /// Open (or create) the progress store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let tree = db.open_tree(TREE_PROGRESS)?;
        Ok(Self { _db: db, tree })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Write one field. Flushes so the value survives an abrupt exit.
    pub fn put<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = Self::serialize(value)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Read one field. A missing key yields `None`; a corrupt value is logged and
    /// also yields `None` so load-time corruption degrades to "no prior progress"
    /// instead of a fatal error.
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read {}: {}", key, e);
                return None;
            }
        };
        match Self::deserialize(bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("discarding corrupt value for {}: {}", key, e);
                None
            }
        }
    }

    /// Remove every `quest:` key in one batch. Used by the explicit reset operation;
    /// the batch keeps the multi-key clear atomic within the tree.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for entry in self.tree.scan_prefix(b"quest:") {
            let (key, _) = entry?;
            batch.remove(key);
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }
}
