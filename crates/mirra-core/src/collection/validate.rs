//! Collection invariant checks and normalization

use crate::collection::{AddonCollection, AddonEntry, AddonManifest};
use thiserror::Error;

/// A malformed collection; a data or programming bug, never silently repaired
#[derive(Error, Debug)]
pub enum InvariantViolation {
    #[error("addon position {found} at index {index} breaks dense ordering")]
    AddonPosition { index: usize, found: usize },

    #[error("catalog position {found} at index {index} of addon '{addon}' breaks dense ordering")]
    CatalogPosition {
        addon: String,
        index: usize,
        found: usize,
    },

    #[error("duplicate catalog '{catalog}' in addon '{addon}'")]
    DuplicateCatalog { addon: String, catalog: String },

    #[error("addon '{addon}' enables catalog '{catalog}' not declared by its manifest")]
    UndeclaredCatalog { addon: String, catalog: String },
}

/// Check that positions form a dense 0..N-1 ordering and that no addon
/// carries two catalogs with the same (type, id) identity
///
/// Catalog ids alone are allowed to repeat across content types.
///
/// # Errors
/// Returns the first [`InvariantViolation`] found
pub fn validate(collection: &AddonCollection) -> Result<(), InvariantViolation> {
    for (index, addon) in collection.addons.iter().enumerate() {
        if addon.position != index {
            return Err(InvariantViolation::AddonPosition {
                index,
                found: addon.position,
            });
        }
        for (cat_index, catalog) in addon.catalogs.iter().enumerate() {
            if catalog.position != cat_index {
                return Err(InvariantViolation::CatalogPosition {
                    addon: addon.name.clone(),
                    index: cat_index,
                    found: catalog.position,
                });
            }
            if addon.catalogs[..cat_index]
                .iter()
                .any(|c| c.key() == catalog.key())
            {
                return Err(InvariantViolation::DuplicateCatalog {
                    addon: addon.name.clone(),
                    catalog: catalog.key().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Return a copy of the collection with positions compacted to 0..N-1,
/// preserving relative order
///
/// Pure and idempotent: normalizing a normalized collection is a no-op.
#[must_use]
pub fn normalize(collection: &AddonCollection) -> AddonCollection {
    let mut normalized = collection.clone();
    normalized.addons.sort_by_key(|a| a.position);
    for addon in &mut normalized.addons {
        addon.catalogs.sort_by_key(|c| c.position);
    }
    normalized.reindex();
    normalized
}

/// Check that every catalog an addon enables is declared by its manifest
///
/// # Errors
/// Returns [`InvariantViolation::UndeclaredCatalog`] for the first
/// enabled catalog the manifest does not declare
pub fn validate_against_manifest(
    addon: &AddonEntry,
    manifest: &AddonManifest,
) -> Result<(), InvariantViolation> {
    for catalog in &addon.catalogs {
        if catalog.enabled && !manifest.catalogs.iter().any(|c| c.key() == catalog.key()) {
            return Err(InvariantViolation::UndeclaredCatalog {
                addon: addon.name.clone(),
                catalog: catalog.key().to_string(),
            });
        }
    }
    Ok(())
}
