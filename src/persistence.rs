//! Snapshot persistence for carts, stock counters and orders.
//!
//! A [`Snapshot`] is the whole durable state of one shop. Stores write it in
//! one piece; the file store goes through a temp file and a rename so a crash
//! never leaves a half-written snapshot behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{CartLine, Order, SkuId};
use crate::error::PersistenceError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub pending_cart: Vec<CartLine>,
    #[serde(default)]
    pub stock: BTreeMap<SkuId, u32>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Returns `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    latest: Mutex<Option<Snapshot>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self.latest.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        *self.latest.lock().await = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stores the snapshot as pretty-printed JSON at `path`.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "Snapshot file not found, starting fresh");
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        info!(
            path = %self.path.display(),
            orders = snapshot.orders.len(),
            skus = snapshot.stock.len(),
            "Loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(snapshot)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), orders = snapshot.orders.len(), "Saved snapshot");
        Ok(())
    }
}
