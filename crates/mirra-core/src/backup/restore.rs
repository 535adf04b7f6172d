//! Snapshot restore

use crate::backup::types::Snapshot;
use crate::backup::BackupError;
use crate::collection::{normalize, validate, ProfileId};
use crate::diff::{diff, ExclusionSet};
use crate::gateway::CollectionGateway;
use crate::reconcile::{apply_sequence, CancelFlag, MirrorOutcome, ProfileLocks};
use crate::storage::{Database, SnapshotStore};
use tracing::{info, warn};
use uuid::Uuid;

/// Reconcile a profile's live collection back to a stored snapshot
///
/// Verifies the snapshot checksum and invariants before touching the
/// profile, then applies the diff under the profile's write lock. The
/// restore diff uses an empty exclusion set: a restore is authoritative
/// and protected addons do not survive it.
///
/// # Errors
/// Fails before any write if the snapshot is missing, corrupt, or
/// invalid. A fetch failure of the live collection is reported as a
/// [`MirrorOutcome::FetchFailed`], not an error.
pub async fn restore_snapshot<G: CollectionGateway + ?Sized>(
    gateway: &G,
    db: &Database,
    locks: &ProfileLocks,
    profile: &ProfileId,
    id: Uuid,
    cancel: &CancelFlag,
) -> Result<MirrorOutcome, BackupError> {
    let snapshot: Snapshot = SnapshotStore::new(db.connection())
        .get(id)?
        .ok_or(BackupError::NotFound(id))?;
    if !snapshot.verify()? {
        return Err(BackupError::Corrupt {
            id,
            reason: "checksum mismatch".to_string(),
        });
    }
    let desired = normalize(&snapshot.collection);
    validate(&desired)?;

    let _guard = locks.write(profile).await;
    let current = match gateway.fetch_collection(profile).await {
        Ok(c) => normalize(&c),
        Err(e) => {
            warn!(profile = %profile, error = %e, "restore fetch failed");
            return Ok(MirrorOutcome::FetchFailed {
                cause: e.to_string(),
            });
        }
    };

    let ops = diff(&desired, &current, &ExclusionSet::new());
    info!(profile = %profile, snapshot = %id, ops = ops.len(), "restoring snapshot");
    Ok(apply_sequence(gateway, profile, ops, cancel).await)
}
