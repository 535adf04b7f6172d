//! Addon collection model types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable profile identifier (user-assigned nickname or account handle)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Create a profile identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A managed account with credentials for the remote collection service
///
/// The profile record is local bookkeeping only; the addon collection it
/// owns is fetched fresh from the remote service on every cycle and never
/// cached here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier
    pub id: ProfileId,
    /// Human-readable name
    pub display_name: String,
    /// Auth key for the remote service, if one has been captured
    #[serde(default)]
    pub auth_key: Option<String>,
    /// When the profile was registered
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Register a new profile
    #[must_use]
    pub fn new(id: ProfileId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            auth_key: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an auth key
    #[must_use]
    pub fn with_auth_key(mut self, key: String) -> Self {
        self.auth_key = Some(key);
        self
    }
}

/// A catalog declared by an addon manifest, with its enablement state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Catalog identifier as declared by the manifest
    pub id: String,
    /// Display name, if the manifest declares one
    #[serde(default)]
    pub name: Option<String>,
    /// Catalog content type (the manifest `type` field)
    #[serde(default)]
    pub kind: Option<String>,
    /// Whether the catalog is enabled for this addon
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Order within the parent addon; dense 0..N-1
    #[serde(default)]
    pub position: usize,
    /// Unrecognized manifest fields, carried opaquely for forward compatibility
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// Identifies a catalog within an addon by manifest id plus content
/// type
///
/// Ids alone collide across types: "top" exists for both movie and
/// series catalogs on the same addon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    /// Catalog identifier as declared by the manifest
    pub id: String,
    /// Content type, when the manifest declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CatalogKey {
    /// Key for a catalog with no declared content type
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    /// Set the content type
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{kind}/{}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

impl CatalogEntry {
    /// Create an enabled catalog entry
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: None,
            enabled: true,
            position: 0,
            extra: Map::new(),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the content type
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the enablement flag
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The (type, id) identity of this catalog
    #[must_use]
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            id: self.id.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// One installed addon within a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonEntry {
    /// Manifest source URL; the addon's identity for matching
    pub transport_url: String,
    /// Display name; may be a local rename overriding the manifest name
    pub name: String,
    /// Whether the addon is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Priority order within the collection; dense 0..N-1
    #[serde(default)]
    pub position: usize,
    /// Catalog configuration, in display order
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
    /// Unrecognized descriptor fields, carried opaquely
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// Unrecognized manifest fields, carried opaquely
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub manifest_extra: Map<String, Value>,
}

impl AddonEntry {
    /// Create an addon entry with no catalogs
    pub fn new(transport_url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            transport_url: transport_url.into(),
            name: name.into(),
            enabled: true,
            position: 0,
            catalogs: Vec::new(),
            extra: Map::new(),
            manifest_extra: Map::new(),
        }
    }

    /// Add a catalog entry, assigning the next position
    #[must_use]
    pub fn with_catalog(mut self, mut catalog: CatalogEntry) -> Self {
        catalog.position = self.catalogs.len();
        self.catalogs.push(catalog);
        self
    }

    /// Copy this addon into a new entry with independent identity
    ///
    /// The copy shares nothing with the source: catalog configuration and
    /// opaque manifest fields are cloned, and the position is left for the
    /// receiving collection to assign.
    #[must_use]
    pub fn duplicate(&self) -> AddonEntry {
        let mut copy = self.clone();
        copy.position = 0;
        copy
    }
}

/// Identifies an addon within a collection by manifest source plus
/// occurrence index among addons sharing that source, in collection order
///
/// This is the operation-target identity: it survives the fetch/apply
/// boundary where in-memory indices do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddonKey {
    /// Manifest source URL
    pub transport_url: String,
    /// Index among addons with the same source (0 for the first)
    pub occurrence: usize,
}

impl AddonKey {
    /// Key for the first occurrence of a manifest source
    pub fn first(transport_url: impl Into<String>) -> Self {
        Self {
            transport_url: transport_url.into(),
            occurrence: 0,
        }
    }
}

impl fmt::Display for AddonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            f.write_str(&self.transport_url)
        } else {
            write!(f, "{}#{}", self.transport_url, self.occurrence)
        }
    }
}

/// An ordered addon collection for one profile at one point in time
///
/// Collections have no persistent identity: they are rebuilt from the
/// remote service on every read and discarded after each cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonCollection {
    /// Addons in priority order
    #[serde(default)]
    pub addons: Vec<AddonEntry>,
}

impl AddonCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addons
    #[must_use]
    pub fn len(&self) -> usize {
        self.addons.len()
    }

    /// Whether the collection has no addons
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }

    /// Append an addon, assigning the next position
    pub fn push(&mut self, mut addon: AddonEntry) {
        addon.position = self.addons.len();
        self.addons.push(addon);
    }

    /// Append an independent copy of an addon from another collection
    pub fn append_clone(&mut self, source: &AddonEntry) {
        self.push(source.duplicate());
    }

    /// The key identifying the addon at `index`
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<AddonKey> {
        let entry = self.addons.get(index)?;
        let occurrence = self.addons[..index]
            .iter()
            .filter(|a| a.transport_url == entry.transport_url)
            .count();
        Some(AddonKey {
            transport_url: entry.transport_url.clone(),
            occurrence,
        })
    }

    /// Resolve a key to the index of the addon it identifies
    #[must_use]
    pub fn resolve(&self, key: &AddonKey) -> Option<usize> {
        let mut seen = 0;
        for (i, addon) in self.addons.iter().enumerate() {
            if addon.transport_url == key.transport_url {
                if seen == key.occurrence {
                    return Some(i);
                }
                seen += 1;
            }
        }
        None
    }

    /// Reassign dense positions to addons and their catalogs, in place
    pub fn reindex(&mut self) {
        for (i, addon) in self.addons.iter_mut().enumerate() {
            addon.position = i;
            for (j, catalog) in addon.catalogs.iter_mut().enumerate() {
                catalog.position = j;
            }
        }
    }
}

/// Declared shape of an addon manifest, as fetched from its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonManifest {
    /// Manifest identifier, if declared
    #[serde(default)]
    pub id: Option<String>,
    /// Default addon name
    pub name: String,
    /// Catalogs the manifest declares
    #[serde(default)]
    pub catalogs: Vec<DeclaredCatalog>,
}

/// A catalog as declared by a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredCatalog {
    /// Catalog identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Content type
    #[serde(default)]
    pub kind: Option<String>,
}

impl DeclaredCatalog {
    /// The (type, id) identity of this catalog
    #[must_use]
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            id: self.id.clone(),
            kind: self.kind.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}
