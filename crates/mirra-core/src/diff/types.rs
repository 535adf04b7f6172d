//! Structural change operations between two addon collections

use crate::collection::{AddonEntry, AddonKey, CatalogKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One structural change, applied to a mirror as its own remote write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Install an addon at the given position, shifting later addons
    InsertAddon { position: usize, addon: Box<AddonEntry> },
    /// Remove the addon the key identifies
    RemoveAddon { addon: AddonKey },
    /// Move the addon to a new position
    MoveAddon { addon: AddonKey, to: usize },
    /// Override the addon's display name
    RenameAddon { addon: AddonKey, name: String },
    /// Enable or disable one catalog; enabling an unknown catalog
    /// materializes it at the end of the addon's catalog list
    SetCatalogEnabled {
        addon: AddonKey,
        catalog: CatalogKey,
        enabled: bool,
    },
    /// Move one catalog to a new position within its addon
    MoveCatalog {
        addon: AddonKey,
        catalog: CatalogKey,
        to: usize,
    },
}

impl Operation {
    /// Short operation kind for logs and summaries
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::InsertAddon { .. } => "insert",
            Operation::RemoveAddon { .. } => "remove",
            Operation::MoveAddon { .. } => "move",
            Operation::RenameAddon { .. } => "rename",
            Operation::SetCatalogEnabled { .. } => "set-catalog",
            Operation::MoveCatalog { .. } => "move-catalog",
        }
    }
}

/// Addons on a mirror that mirroring must not remove
///
/// An explicit set supplied by the caller, never inferred: the user marks
/// an addon as locally owned and the diff engine treats it as invisible.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    keys: HashSet<AddonKey>,
}

impl ExclusionSet {
    /// Empty exclusion set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an addon as locally protected; returns false if already marked
    pub fn insert(&mut self, key: AddonKey) -> bool {
        self.keys.insert(key)
    }

    /// Unmark an addon; returns false if it was not marked
    pub fn remove(&mut self, key: &AddonKey) -> bool {
        self.keys.remove(key)
    }

    /// Whether the key is protected
    #[must_use]
    pub fn contains(&self, key: &AddonKey) -> bool {
        self.keys.contains(key)
    }

    /// Whether no addon is protected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the protected keys
    pub fn iter(&self) -> impl Iterator<Item = &AddonKey> {
        self.keys.iter()
    }
}

impl FromIterator<AddonKey> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = AddonKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
