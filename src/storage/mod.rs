//! Snapshot persistence.
//!
//! Each run writes one snapshot that fully replaces the previous one. The
//! read side must never fail: a missing or unreadable snapshot is served as
//! an empty `ok` snapshot.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RunSnapshot;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Replace the stored snapshot. Returns where it was written.
    async fn write_snapshot(&self, snapshot: &RunSnapshot) -> Result<String>;

    /// Read the stored snapshot; `None` if there is none yet.
    async fn load_snapshot(&self) -> Result<Option<RunSnapshot>>;
}

/// Load the stored snapshot, falling back to an empty `ok` snapshot.
pub async fn load_snapshot_or_empty(storage: &dyn SnapshotStorage) -> RunSnapshot {
    match storage.load_snapshot().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            log::warn!("No snapshot stored yet, serving empty status");
            RunSnapshot::empty()
        }
        Err(error) => {
            log::warn!("Stored snapshot is unreadable ({error}), serving empty status");
            RunSnapshot::empty()
        }
    }
}
