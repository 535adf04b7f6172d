//! Local application of operations to an in-memory collection
//!
//! Pure and synchronous. The reconciliation engine applies operations
//! remotely one write at a time; this module is the reference semantics
//! those writes follow, and is what read-modify-write gateways and the
//! restore path use to mutate a fetched collection.

use crate::collection::{AddonCollection, AddonKey, CatalogEntry};
use crate::diff::Operation;
use thiserror::Error;

/// Errors applying an operation to a collection
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("operation target not found: {0}")]
    TargetMissing(String),

    #[error("position {position} out of bounds for length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
}

/// Apply a sequence of operations in order, stopping at the first failure
///
/// # Errors
/// Returns the error of the first operation that fails; earlier
/// operations remain applied.
pub fn apply_all(collection: &mut AddonCollection, ops: &[Operation]) -> Result<(), ApplyError> {
    for op in ops {
        apply_operation(collection, op)?;
    }
    Ok(())
}

/// Apply one operation to a collection
///
/// # Errors
/// Fails with [`ApplyError::TargetMissing`] if the addon or catalog the
/// operation names does not exist, or [`ApplyError::PositionOutOfBounds`]
/// for an unreachable position.
pub fn apply_operation(
    collection: &mut AddonCollection,
    op: &Operation,
) -> Result<(), ApplyError> {
    match op {
        Operation::InsertAddon { position, addon } => {
            if *position > collection.len() {
                return Err(ApplyError::PositionOutOfBounds {
                    position: *position,
                    len: collection.len(),
                });
            }
            collection.addons.insert(*position, (**addon).clone());
            collection.reindex();
        }
        Operation::RemoveAddon { addon } => {
            let index = resolve(collection, addon)?;
            collection.addons.remove(index);
            collection.reindex();
        }
        Operation::MoveAddon { addon, to } => {
            let index = resolve(collection, addon)?;
            let entry = collection.addons.remove(index);
            if *to > collection.len() {
                // Undo the removal before reporting; the collection must
                // not be left mutated by a failed operation.
                collection.addons.insert(index, entry);
                return Err(ApplyError::PositionOutOfBounds {
                    position: *to,
                    len: collection.len(),
                });
            }
            collection.addons.insert(*to, entry);
            collection.reindex();
        }
        Operation::RenameAddon { addon, name } => {
            let index = resolve(collection, addon)?;
            collection.addons[index].name.clone_from(name);
        }
        Operation::SetCatalogEnabled {
            addon,
            catalog,
            enabled,
        } => {
            let index = resolve(collection, addon)?;
            let entry = &mut collection.addons[index];
            match entry.catalogs.iter_mut().find(|c| c.key() == *catalog) {
                Some(existing) => existing.enabled = *enabled,
                None => {
                    let mut new_catalog =
                        CatalogEntry::new(catalog.id.clone()).with_enabled(*enabled);
                    new_catalog.kind.clone_from(&catalog.kind);
                    new_catalog.position = entry.catalogs.len();
                    entry.catalogs.push(new_catalog);
                }
            }
        }
        Operation::MoveCatalog { addon, catalog, to } => {
            let index = resolve(collection, addon)?;
            let entry = &mut collection.addons[index];
            let Some(cat_index) = entry.catalogs.iter().position(|c| c.key() == *catalog) else {
                return Err(ApplyError::TargetMissing(format!(
                    "catalog '{catalog}' on {addon}"
                )));
            };
            let item = entry.catalogs.remove(cat_index);
            if *to > entry.catalogs.len() {
                entry.catalogs.insert(cat_index, item);
                return Err(ApplyError::PositionOutOfBounds {
                    position: *to,
                    len: entry.catalogs.len(),
                });
            }
            entry.catalogs.insert(*to, item);
            collection.reindex();
        }
    }
    Ok(())
}

fn resolve(collection: &AddonCollection, key: &AddonKey) -> Result<usize, ApplyError> {
    collection
        .resolve(key)
        .ok_or_else(|| ApplyError::TargetMissing(key.to_string()))
}
