//! Mirror binding and protection persistence

use crate::collection::{AddonKey, ProfileId};
use crate::diff::ExclusionSet;
use crate::registry::MirrorBinding;
use crate::storage::db::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;

/// Binding and protection storage operations
pub struct BindingStore<'a> {
    conn: &'a Connection,
}

impl<'a> BindingStore<'a> {
    /// Create a new binding store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist a binding
    ///
    /// # Errors
    /// Returns an error if the binding cannot be stored
    pub fn insert(&self, binding: &MirrorBinding) -> Result<(), StorageError> {
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO bindings (mirror_id, master_id, created_at)
            VALUES (?1, ?2, ?3)
            ",
            params![
                binding.mirror.as_str(),
                binding.master.as_str(),
                binding.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove a mirror's binding
    ///
    /// # Errors
    /// Returns an error if the delete fails
    pub fn delete(&self, mirror: &ProfileId) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            r"
            DELETE FROM bindings WHERE mirror_id = ?1
            ",
            params![mirror.as_str()],
        )?;
        Ok(deleted > 0)
    }

    /// List all bindings in registration order
    ///
    /// # Errors
    /// Returns an error if the bindings cannot be listed
    pub fn list(&self) -> Result<Vec<MirrorBinding>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT mirror_id, master_id, created_at FROM bindings ORDER BY rowid
            ",
        )?;

        let rows = stmt.query_map([], |row| {
            let mirror: String = row.get(0)?;
            let master: String = row.get(1)?;
            let created_at: String = row.get(2)?;
            Ok((mirror, master, created_at))
        })?;

        let mut bindings = Vec::new();
        for row in rows {
            let (mirror, master, created_at_str) = row?;
            let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|e| StorageError::Encoding(format!("Invalid datetime: {e}")))?
                .with_timezone(&Utc);
            bindings.push(MirrorBinding {
                master: ProfileId::from(master),
                mirror: ProfileId::from(mirror),
                created_at,
            });
        }

        Ok(bindings)
    }

    /// Persist a protected addon key for a mirror
    ///
    /// # Errors
    /// Returns an error if the key cannot be stored
    pub fn protect(&self, mirror: &ProfileId, key: &AddonKey) -> Result<(), StorageError> {
        self.conn.execute(
            r"
            INSERT OR IGNORE INTO protected_addons (mirror_id, transport_url, occurrence)
            VALUES (?1, ?2, ?3)
            ",
            params![
                mirror.as_str(),
                key.transport_url,
                i64::try_from(key.occurrence).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(())
    }

    /// Remove a protected addon key
    ///
    /// # Errors
    /// Returns an error if the delete fails
    pub fn unprotect(&self, mirror: &ProfileId, key: &AddonKey) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            r"
            DELETE FROM protected_addons
            WHERE mirror_id = ?1 AND transport_url = ?2 AND occurrence = ?3
            ",
            params![
                mirror.as_str(),
                key.transport_url,
                i64::try_from(key.occurrence).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(deleted > 0)
    }

    /// Load every mirror's protected addon set
    ///
    /// # Errors
    /// Returns an error if the keys cannot be listed
    pub fn protected_sets(&self) -> Result<HashMap<ProfileId, ExclusionSet>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT mirror_id, transport_url, occurrence FROM protected_addons
            ",
        )?;

        let rows = stmt.query_map([], |row| {
            let mirror: String = row.get(0)?;
            let url: String = row.get(1)?;
            let occurrence: i64 = row.get(2)?;
            Ok((mirror, url, occurrence))
        })?;

        let mut sets: HashMap<ProfileId, ExclusionSet> = HashMap::new();
        for row in rows {
            let (mirror, url, occurrence) = row?;
            sets.entry(ProfileId::from(mirror))
                .or_default()
                .insert(AddonKey {
                    transport_url: url,
                    occurrence: usize::try_from(occurrence).unwrap_or(0),
                });
        }

        Ok(sets)
    }
}
