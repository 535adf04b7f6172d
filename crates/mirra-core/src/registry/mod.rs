//! Mirror policy registry
//!
//! In-memory registry of master/mirror bindings and per-mirror
//! protected-addon sets. Each mirror follows exactly one master;
//! binding chains are allowed but cycles are rejected at registration.

use crate::collection::{AddonKey, ProfileId};
use crate::diff::ExclusionSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors registering a mirror binding
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("binding '{mirror}' -> '{master}' would create a cycle")]
    Cycle { master: ProfileId, mirror: ProfileId },

    #[error("'{mirror}' already mirrors '{existing}'")]
    Duplicate {
        mirror: ProfileId,
        existing: ProfileId,
    },
}

/// One mirror-follows-master relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorBinding {
    pub master: ProfileId,
    pub mirror: ProfileId,
    pub created_at: DateTime<Utc>,
}

/// Registry of bindings and protection policy
#[derive(Debug, Default)]
pub struct MirrorRegistry {
    bindings: Vec<MirrorBinding>,
    protected: HashMap<ProfileId, ExclusionSet>,
}

impl MirrorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted state
    #[must_use]
    pub fn from_parts(
        bindings: Vec<MirrorBinding>,
        protected: HashMap<ProfileId, ExclusionSet>,
    ) -> Self {
        Self {
            bindings,
            protected,
        }
    }

    /// Register `mirror` as following `master`
    ///
    /// Re-registering an identical binding is a no-op returning
    /// `Ok(false)`.
    ///
    /// # Errors
    /// Rejects self-mirroring and any binding whose master is itself a
    /// transitive mirror of the new mirror, and rejects a second master
    /// for a mirror that already has one.
    pub fn add(&mut self, master: ProfileId, mirror: ProfileId) -> Result<bool, RegistryError> {
        if let Some(existing) = self.master_of(&mirror) {
            if *existing == master {
                return Ok(false);
            }
            return Err(RegistryError::Duplicate {
                mirror,
                existing: existing.clone(),
            });
        }
        if master == mirror || self.is_ancestor(&mirror, &master) {
            return Err(RegistryError::Cycle { master, mirror });
        }
        self.bindings.push(MirrorBinding {
            master,
            mirror,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    /// Remove a mirror's binding; returns false if none existed
    pub fn remove(&mut self, mirror: &ProfileId) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.mirror != *mirror);
        self.bindings.len() != before
    }

    /// The master a mirror follows, if bound
    #[must_use]
    pub fn master_of(&self, mirror: &ProfileId) -> Option<&ProfileId> {
        self.bindings
            .iter()
            .find(|b| b.mirror == *mirror)
            .map(|b| &b.master)
    }

    /// Mirrors of a master, in registration order
    #[must_use]
    pub fn mirrors_of(&self, master: &ProfileId) -> Vec<&ProfileId> {
        self.bindings
            .iter()
            .filter(|b| b.master == *master)
            .map(|b| &b.mirror)
            .collect()
    }

    /// Every profile that has at least one mirror, in first-seen order
    #[must_use]
    pub fn masters(&self) -> Vec<&ProfileId> {
        let mut seen = Vec::new();
        for binding in &self.bindings {
            if !seen.contains(&&binding.master) {
                seen.push(&binding.master);
            }
        }
        seen
    }

    /// All registered bindings
    #[must_use]
    pub fn bindings(&self) -> &[MirrorBinding] {
        &self.bindings
    }

    /// Mark an addon on a mirror as protected from reconciliation
    pub fn protect(&mut self, mirror: &ProfileId, key: AddonKey) -> bool {
        self.protected.entry(mirror.clone()).or_default().insert(key)
    }

    /// Unmark a protected addon
    pub fn unprotect(&mut self, mirror: &ProfileId, key: &AddonKey) -> bool {
        self.protected
            .get_mut(mirror)
            .is_some_and(|set| set.remove(key))
    }

    /// The mirror's protected addons
    #[must_use]
    pub fn exclusions(&self, mirror: &ProfileId) -> ExclusionSet {
        self.protected.get(mirror).cloned().unwrap_or_default()
    }

    // Walks the binding chain upward from `profile` looking for `needle`.
    fn is_ancestor(&self, needle: &ProfileId, profile: &ProfileId) -> bool {
        let mut current = profile;
        let mut hops = 0;
        while let Some(master) = self.master_of(current) {
            if master == needle {
                return true;
            }
            current = master;
            hops += 1;
            if hops > self.bindings.len() {
                return true;
            }
        }
        false
    }
}
