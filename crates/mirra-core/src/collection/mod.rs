//! Addon collection model
//!
//! Pure data plus invariant checks. A collection is the ordered addon
//! list of one profile at one instant; it is rebuilt from the remote
//! service on every read.

pub mod types;
pub mod validate;

pub use types::{
    AddonCollection, AddonEntry, AddonKey, AddonManifest, CatalogEntry, CatalogKey,
    DeclaredCatalog, Profile, ProfileId,
};
pub use validate::{normalize, validate, validate_against_manifest, InvariantViolation};
