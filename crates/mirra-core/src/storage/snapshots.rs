//! Snapshot persistence

use crate::backup::{Snapshot, SnapshotSummary};
use crate::collection::ProfileId;
use crate::storage::db::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Snapshot storage operations
pub struct SnapshotStore<'a> {
    conn: &'a Connection,
}

impl<'a> SnapshotStore<'a> {
    /// Create a new snapshot store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a snapshot
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be stored
    pub fn insert(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(&snapshot.collection)
            .map_err(|e| StorageError::Encoding(format!("Failed to serialize snapshot: {e}")))?;

        self.conn.execute(
            r"
            INSERT INTO snapshots (id, profile_id, description, data, checksum, addon_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                snapshot.id.to_string(),
                snapshot.profile.as_str(),
                snapshot.description,
                json,
                snapshot.checksum,
                i64::try_from(snapshot.collection.len()).unwrap_or(i64::MAX),
                snapshot.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a snapshot by id, with its full collection payload
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be retrieved
    pub fn get(&self, id: Uuid) -> Result<Option<Snapshot>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT profile_id, description, data, checksum, created_at
            FROM snapshots WHERE id = ?1
            ",
        )?;

        let result = stmt.query_row(params![id.to_string()], |row| {
            let profile: String = row.get(0)?;
            let description: String = row.get(1)?;
            let json: String = row.get(2)?;
            let checksum: String = row.get(3)?;
            let created_at: String = row.get(4)?;
            Ok((profile, description, json, checksum, created_at))
        });

        match result {
            Ok((profile, description, json, checksum, created_at_str)) => {
                let collection = serde_json::from_str(&json).map_err(|e| {
                    StorageError::Encoding(format!("Failed to parse snapshot: {e}"))
                })?;
                let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                    .map_err(|e| StorageError::Encoding(format!("Invalid datetime: {e}")))?
                    .with_timezone(&Utc);
                Ok(Some(Snapshot {
                    id,
                    profile: ProfileId::from(profile),
                    description,
                    collection,
                    checksum,
                    created_at,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List snapshots for a profile, oldest first
    ///
    /// # Errors
    /// Returns an error if the snapshots cannot be listed
    pub fn list(&self, profile: &ProfileId) -> Result<Vec<SnapshotSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, description, addon_count, created_at
            FROM snapshots WHERE profile_id = ?1
            ORDER BY created_at, rowid
            ",
        )?;

        let rows = stmt.query_map(params![profile.as_str()], |row| {
            let id: String = row.get(0)?;
            let description: String = row.get(1)?;
            let addon_count: i64 = row.get(2)?;
            let created_at: String = row.get(3)?;
            Ok((id, description, addon_count, created_at))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id_str, description, addon_count, created_at_str) = row?;
            let id = Uuid::parse_str(&id_str)
                .map_err(|e| StorageError::Encoding(format!("Invalid UUID: {e}")))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|e| StorageError::Encoding(format!("Invalid datetime: {e}")))?
                .with_timezone(&Utc);
            summaries.push(SnapshotSummary {
                id,
                profile: profile.clone(),
                description,
                addon_count: usize::try_from(addon_count).unwrap_or(0),
                created_at,
            });
        }

        Ok(summaries)
    }

    /// Replace a snapshot's description
    ///
    /// # Errors
    /// Returns an error if the update fails
    pub fn rename(&self, id: Uuid, description: &str) -> Result<bool, StorageError> {
        let updated = self.conn.execute(
            r"
            UPDATE snapshots SET description = ?1 WHERE id = ?2
            ",
            params![description, id.to_string()],
        )?;
        Ok(updated > 0)
    }

    /// Delete a snapshot
    ///
    /// # Errors
    /// Returns an error if the delete fails
    pub fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            r"
            DELETE FROM snapshots WHERE id = ?1
            ",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }
}
