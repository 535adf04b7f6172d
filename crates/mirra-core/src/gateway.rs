//! Remote collection gateway contract
//!
//! The core never talks to the remote addon-collection service directly;
//! it consumes this capability, and every network call behind it is a
//! suspension point. Everything above it (diff, model) is pure.

use crate::collection::{AddonCollection, AddonManifest, ProfileId};
use crate::diff::Operation;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a gateway implementation
///
/// All variants are transient from the core's point of view: they are
/// converted into structured outcome records at the reconciliation and
/// backup boundaries, never propagated as bare failures of a whole run.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("failed to fetch collection for '{profile}': {reason}")]
    Fetch { profile: ProfileId, reason: String },

    #[error("failed to apply operation for '{profile}': {reason}")]
    Apply { profile: ProfileId, reason: String },

    #[error("failed to fetch manifest from '{url}': {reason}")]
    Manifest { url: String, reason: String },

    #[error("no auth key known for profile '{0}'")]
    Auth(ProfileId),
}

/// Capability for reading and mutating a profile's remote addon collection
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// Fetch the profile's current addon collection
    async fn fetch_collection(&self, profile: &ProfileId) -> Result<AddonCollection, GatewayError>;

    /// Apply a single operation to the profile's remote collection
    async fn apply_operation(
        &self,
        profile: &ProfileId,
        operation: &Operation,
    ) -> Result<(), GatewayError>;

    /// Fetch an addon manifest from its source URL
    ///
    /// Used to discover declared catalogs for new addons and to validate
    /// renames and clones.
    async fn fetch_manifest(&self, transport_url: &str) -> Result<AddonManifest, GatewayError>;
}
