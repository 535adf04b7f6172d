//! Snapshot types

use crate::collection::{AddonCollection, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A point-in-time capture of one profile's addon collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier
    pub id: Uuid,
    /// Profile the collection was captured from
    pub profile: ProfileId,
    /// User-supplied description
    pub description: String,
    /// The captured collection, normalized
    pub collection: AddonCollection,
    /// SHA-256 of the serialized collection, hex-encoded
    pub checksum: String,
    /// Capture time
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture a collection into a new snapshot
    ///
    /// # Errors
    /// Fails if the collection cannot be serialized for checksumming.
    pub fn capture(
        profile: ProfileId,
        description: String,
        collection: AddonCollection,
    ) -> Result<Self, serde_json::Error> {
        let checksum = checksum_of(&collection)?;
        Ok(Self {
            id: Uuid::new_v4(),
            profile,
            description,
            collection,
            checksum,
            created_at: Utc::now(),
        })
    }

    /// Whether the stored checksum still matches the collection payload
    ///
    /// # Errors
    /// Fails if the collection cannot be serialized.
    pub fn verify(&self) -> Result<bool, serde_json::Error> {
        Ok(checksum_of(&self.collection)? == self.checksum)
    }
}

fn checksum_of(collection: &AddonCollection) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(collection)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Listing row for a stored snapshot, without the collection payload
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub id: Uuid,
    pub profile: ProfileId,
    pub description: String,
    pub addon_count: usize,
    pub created_at: DateTime<Utc>,
}
