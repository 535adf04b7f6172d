//! Profile storage operations (CRUD)

use crate::collection::{Profile, ProfileId};
use crate::storage::db::StorageError;
use rusqlite::{params, Connection};

/// Profile storage operations
pub struct ProfileStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProfileStore<'a> {
    /// Create a new profile store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Register a profile
    ///
    /// # Errors
    /// Returns an error if the profile cannot be stored or the id is
    /// already taken
    pub fn create(&self, profile: &Profile) -> Result<(), StorageError> {
        let json = serde_json::to_string(profile)
            .map_err(|e| StorageError::Encoding(format!("Failed to serialize profile: {e}")))?;

        self.conn.execute(
            r"
            INSERT INTO profiles (id, display_name, data, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                profile.id.as_str(),
                profile.display_name,
                json,
                profile.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a profile by id
    ///
    /// # Errors
    /// Returns an error if the profile cannot be retrieved
    pub fn get(&self, id: &ProfileId) -> Result<Option<Profile>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT data FROM profiles WHERE id = ?1
            ",
        )?;

        let result = stmt.query_row(params![id.as_str()], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        });

        match result {
            Ok(json) => {
                let profile: Profile = serde_json::from_str(&json).map_err(|e| {
                    StorageError::Encoding(format!("Failed to parse profile: {e}"))
                })?;
                Ok(Some(profile))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all profiles, ordered by id
    ///
    /// # Errors
    /// Returns an error if the profiles cannot be listed
    pub fn list(&self) -> Result<Vec<Profile>, StorageError> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT data FROM profiles ORDER BY id
            ",
        )?;

        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut profiles = Vec::new();
        for row in rows {
            let json = row?;
            let profile: Profile = serde_json::from_str(&json)
                .map_err(|e| StorageError::Encoding(format!("Failed to parse profile: {e}")))?;
            profiles.push(profile);
        }

        Ok(profiles)
    }

    /// Delete a profile
    ///
    /// # Errors
    /// Returns an error if the delete fails
    pub fn delete(&self, id: &ProfileId) -> Result<bool, StorageError> {
        let deleted = self.conn.execute(
            r"
            DELETE FROM profiles WHERE id = ?1
            ",
            params![id.as_str()],
        )?;

        Ok(deleted > 0)
    }
}
