//! Snapshot capture and restore
//!
//! Snapshots are checksummed point-in-time copies of a profile's
//! collection, stored locally. Restore reuses the diff and apply
//! machinery: the snapshot becomes the desired state and the profile's
//! live collection is reconciled toward it under a write lock.

mod create;
mod restore;
mod types;

pub use create::create_snapshot;
pub use restore::restore_snapshot;
pub use types::{Snapshot, SnapshotSummary};

use crate::collection::validate::InvariantViolation;
use crate::gateway::GatewayError;
use crate::storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Errors from snapshot operations
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("snapshot {0} not found")]
    NotFound(Uuid),

    #[error("snapshot {id} is corrupt: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
