//! Snapshot creation

use crate::backup::types::Snapshot;
use crate::backup::BackupError;
use crate::collection::{normalize, ProfileId};
use crate::gateway::CollectionGateway;
use crate::storage::{Database, SnapshotStore};
use tracing::info;

/// Fetch a profile's live collection and store it as a new snapshot
///
/// # Errors
/// Fails if the fetch, serialization, or storage write fails; a failed
/// fetch stores nothing.
pub async fn create_snapshot<G: CollectionGateway + ?Sized>(
    gateway: &G,
    db: &Database,
    profile: &ProfileId,
    description: String,
) -> Result<Snapshot, BackupError> {
    let collection = normalize(&gateway.fetch_collection(profile).await?);
    let snapshot = Snapshot::capture(profile.clone(), description, collection)?;
    SnapshotStore::new(db.connection()).insert(&snapshot)?;
    info!(
        profile = %profile,
        snapshot = %snapshot.id,
        addons = snapshot.collection.len(),
        "snapshot created"
    );
    Ok(snapshot)
}
