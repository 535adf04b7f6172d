//! High-level service facade
//!
//! Ties the registry, storage, gateway and engine together behind one
//! API the CLI (or any other front end) drives. Registry mutations are
//! validated in memory first and persisted before returning; a
//! persistence failure surfaces as an error and the in-memory change is
//! rolled back.

use crate::backup::{
    create_snapshot, restore_snapshot, BackupError, Snapshot, SnapshotSummary,
};
use crate::collection::{
    normalize, validate_against_manifest, AddonCollection, AddonEntry, AddonKey, CatalogEntry,
    InvariantViolation, Profile, ProfileId,
};
use crate::diff::{diff, ExclusionSet, Operation};
use crate::gateway::{CollectionGateway, GatewayError};
use crate::reconcile::{
    apply_sequence, CancelFlag, MirrorOutcome, ProfileLocks, ReconcileEngine, RunReport,
};
use crate::registry::{MirrorRegistry, RegistryError};
use crate::storage::{BindingStore, Database, ProfileStore, SnapshotStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Errors from service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("profile '{0}' not found")]
    ProfileNotFound(ProfileId),

    #[error("profile '{0}' already exists")]
    ProfileExists(ProfileId),

    #[error("profile '{0}' has no mirrors")]
    NoMirrors(ProfileId),

    #[error("addon '{addon}' not found on profile '{profile}'")]
    AddonNotFound { profile: ProfileId, addon: AddonKey },

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// Addon-collection mirroring service
pub struct MirrorService<G> {
    db: Database,
    registry: MirrorRegistry,
    locks: Arc<ProfileLocks>,
    engine: ReconcileEngine<G>,
    gateway: Arc<G>,
}

impl<G: CollectionGateway + 'static> MirrorService<G> {
    /// Build a service over an opened database, loading persisted
    /// registry state
    ///
    /// # Errors
    /// Fails if the persisted bindings or protection sets cannot be read.
    pub fn new(db: Database, gateway: Arc<G>) -> Result<Self, ServiceError> {
        let store = BindingStore::new(db.connection());
        let registry = MirrorRegistry::from_parts(store.list()?, store.protected_sets()?);
        let locks = Arc::new(ProfileLocks::new());
        let engine = ReconcileEngine::new(Arc::clone(&gateway), Arc::clone(&locks));
        Ok(Self {
            db,
            registry,
            locks,
            engine,
            gateway,
        })
    }

    // ---- Profiles ----

    /// Register a profile
    ///
    /// # Errors
    /// Fails if the id is already registered or the write fails.
    pub fn add_profile(&self, profile: Profile) -> Result<(), ServiceError> {
        let store = ProfileStore::new(self.db.connection());
        if store.get(&profile.id)?.is_some() {
            return Err(ServiceError::ProfileExists(profile.id));
        }
        store.create(&profile)?;
        info!(profile = %profile.id, "profile registered");
        Ok(())
    }

    /// Look up a profile
    ///
    /// # Errors
    /// Fails if the read fails.
    pub fn get_profile(&self, id: &ProfileId) -> Result<Option<Profile>, ServiceError> {
        Ok(ProfileStore::new(self.db.connection()).get(id)?)
    }

    /// List registered profiles
    ///
    /// # Errors
    /// Fails if the read fails.
    pub fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        Ok(ProfileStore::new(self.db.connection()).list()?)
    }

    /// Remove a profile and any binding it participates in as a mirror
    ///
    /// # Errors
    /// Fails if a write fails.
    pub fn remove_profile(&mut self, id: &ProfileId) -> Result<bool, ServiceError> {
        self.registry.remove(id);
        BindingStore::new(self.db.connection()).delete(id)?;
        Ok(ProfileStore::new(self.db.connection()).delete(id)?)
    }

    // ---- Bindings and protection ----

    /// Bind a mirror to a master
    ///
    /// Returns false when the identical binding already exists.
    ///
    /// # Errors
    /// Fails on cycles, on a second master for the same mirror, on an
    /// unknown profile, or when persisting the binding fails.
    pub fn add_binding(
        &mut self,
        master: ProfileId,
        mirror: ProfileId,
    ) -> Result<bool, ServiceError> {
        self.require_profile(&master)?;
        self.require_profile(&mirror)?;
        if !self.registry.add(master.clone(), mirror.clone())? {
            return Ok(false);
        }
        let binding = self
            .registry
            .bindings()
            .last()
            .cloned()
            .ok_or_else(|| StorageError::Encoding("binding vanished after add".to_string()))?;
        if let Err(e) = BindingStore::new(self.db.connection()).insert(&binding) {
            self.registry.remove(&mirror);
            return Err(e.into());
        }
        info!(master = %master, mirror = %mirror, "mirror bound");
        Ok(true)
    }

    /// Remove a mirror's binding
    ///
    /// # Errors
    /// Fails if the persisted binding cannot be deleted.
    pub fn remove_binding(&mut self, mirror: &ProfileId) -> Result<bool, ServiceError> {
        let removed = self.registry.remove(mirror);
        BindingStore::new(self.db.connection()).delete(mirror)?;
        Ok(removed)
    }

    /// Access the registry for reads
    #[must_use]
    pub fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    /// Protect an addon on a mirror from reconciliation
    ///
    /// # Errors
    /// Fails if the key cannot be persisted.
    pub fn protect(&mut self, mirror: &ProfileId, key: AddonKey) -> Result<bool, ServiceError> {
        BindingStore::new(self.db.connection()).protect(mirror, &key)?;
        Ok(self.registry.protect(mirror, key))
    }

    /// Remove an addon's protection
    ///
    /// # Errors
    /// Fails if the persisted key cannot be deleted.
    pub fn unprotect(&mut self, mirror: &ProfileId, key: &AddonKey) -> Result<bool, ServiceError> {
        BindingStore::new(self.db.connection()).unprotect(mirror, key)?;
        Ok(self.registry.unprotect(mirror, key))
    }

    // ---- Reconciliation ----

    /// Run one reconciliation cycle for a master
    ///
    /// # Errors
    /// Fails if the master has no mirrors or its collection cannot be
    /// fetched; per-mirror failures are reported inside the
    /// [`RunReport`].
    pub async fn run_reconciliation(
        &self,
        master: &ProfileId,
        cancel: &CancelFlag,
    ) -> Result<RunReport, ServiceError> {
        let mirrors: Vec<(ProfileId, ExclusionSet)> = self
            .registry
            .mirrors_of(master)
            .into_iter()
            .map(|m| (m.clone(), self.registry.exclusions(m)))
            .collect();
        if mirrors.is_empty() {
            return Err(ServiceError::NoMirrors(master.clone()));
        }
        Ok(self.engine.run(master, &mirrors, cancel).await?)
    }

    /// Run reconciliation for every master that has mirrors
    ///
    /// Masters whose fetch fails are skipped with their error recorded;
    /// one broken master never blocks the rest.
    pub async fn run_all(
        &self,
        cancel: &CancelFlag,
    ) -> Vec<(ProfileId, Result<RunReport, ServiceError>)> {
        let masters: Vec<ProfileId> = self.registry.masters().into_iter().cloned().collect();
        let mut results = Vec::with_capacity(masters.len());
        for master in masters {
            let result = self.run_reconciliation(&master, cancel).await;
            results.push((master, result));
        }
        results
    }

    // ---- Snapshots ----

    /// Capture a profile's live collection as a snapshot
    ///
    /// # Errors
    /// Fails if the fetch or the storage write fails.
    pub async fn create_backup(
        &self,
        profile: &ProfileId,
        description: String,
    ) -> Result<Snapshot, ServiceError> {
        self.require_profile(profile)?;
        Ok(create_snapshot(self.gateway.as_ref(), &self.db, profile, description).await?)
    }

    /// List a profile's snapshots, oldest first
    ///
    /// # Errors
    /// Fails if the read fails.
    pub fn list_backups(&self, profile: &ProfileId) -> Result<Vec<SnapshotSummary>, ServiceError> {
        Ok(SnapshotStore::new(self.db.connection()).list(profile)?)
    }

    /// Reconcile a profile's live collection back to a snapshot
    ///
    /// # Errors
    /// Fails if the snapshot is missing or corrupt; fetch failures are
    /// reported in the outcome.
    pub async fn restore_backup(
        &self,
        profile: &ProfileId,
        id: Uuid,
        cancel: &CancelFlag,
    ) -> Result<MirrorOutcome, ServiceError> {
        self.require_profile(profile)?;
        Ok(restore_snapshot(
            self.gateway.as_ref(),
            &self.db,
            &self.locks,
            profile,
            id,
            cancel,
        )
        .await?)
    }

    /// Delete a snapshot
    ///
    /// # Errors
    /// Fails if the delete fails.
    pub fn delete_backup(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(SnapshotStore::new(self.db.connection()).delete(id)?)
    }

    /// Replace a snapshot's description
    ///
    /// # Errors
    /// Fails if the snapshot does not exist or the update fails.
    pub fn rename_backup(&self, id: Uuid, description: &str) -> Result<(), ServiceError> {
        if !SnapshotStore::new(self.db.connection()).rename(id, description)? {
            return Err(BackupError::NotFound(id).into());
        }
        Ok(())
    }

    // ---- Direct collection operations ----

    /// Copy one profile's live collection onto another, replacing it
    ///
    /// # Errors
    /// Fails if the source cannot be fetched; target apply failures are
    /// reported in the outcome.
    pub async fn clone_collection(
        &self,
        source: &ProfileId,
        target: &ProfileId,
        cancel: &CancelFlag,
    ) -> Result<MirrorOutcome, ServiceError> {
        self.require_profile(source)?;
        self.require_profile(target)?;
        let desired = normalize(&self.gateway.fetch_collection(source).await?);

        let _guard = self.locks.write(target).await;
        let current = match self.gateway.fetch_collection(target).await {
            Ok(c) => normalize(&c),
            Err(e) => {
                return Ok(MirrorOutcome::FetchFailed {
                    cause: e.to_string(),
                })
            }
        };
        let ops = diff(&desired, &current, &ExclusionSet::new());
        info!(source = %source, target = %target, ops = ops.len(), "cloning collection");
        Ok(apply_sequence(self.gateway.as_ref(), target, ops, cancel).await)
    }

    /// Copy a single addon from one profile onto another, appending it
    ///
    /// The copy keeps the source's catalog configuration and rename but
    /// gets its own position on the target; the source is untouched.
    /// The addon's manifest is fetched first and the clone is refused if
    /// the entry enables a catalog the manifest does not declare.
    ///
    /// # Errors
    /// Fails if either profile is unknown, the key does not resolve on
    /// the source, the manifest rejects the entry, or a fetch or apply
    /// fails.
    pub async fn clone_addon(
        &self,
        source: &ProfileId,
        key: &AddonKey,
        target: &ProfileId,
    ) -> Result<AddonEntry, ServiceError> {
        self.require_profile(source)?;
        self.require_profile(target)?;
        let collection = normalize(&self.gateway.fetch_collection(source).await?);
        let index = collection
            .resolve(key)
            .ok_or_else(|| ServiceError::AddonNotFound {
                profile: source.clone(),
                addon: key.clone(),
            })?;
        let entry = &collection.addons[index];
        let manifest = self.gateway.fetch_manifest(&entry.transport_url).await?;
        validate_against_manifest(entry, &manifest)?;
        let copy = entry.duplicate();

        let _guard = self.locks.write(target).await;
        let current = self.gateway.fetch_collection(target).await?;
        let op = Operation::InsertAddon {
            position: current.len(),
            addon: Box::new(copy.clone()),
        };
        self.gateway.apply_operation(target, &op).await?;
        info!(source = %source, target = %target, addon = %key, "addon cloned");
        Ok(copy)
    }

    /// Install an addon on a profile from its manifest URL
    ///
    /// Fetches the manifest to discover the addon's name and declared
    /// catalogs, then appends it to the profile's collection.
    ///
    /// # Errors
    /// Fails if the manifest or collection fetch fails, or the append
    /// cannot be applied.
    pub async fn install_addon(
        &self,
        profile: &ProfileId,
        transport_url: &str,
    ) -> Result<AddonEntry, ServiceError> {
        self.require_profile(profile)?;
        let manifest = self.gateway.fetch_manifest(transport_url).await?;

        let mut addon = AddonEntry::new(transport_url, manifest.name.clone());
        for declared in &manifest.catalogs {
            let mut catalog = CatalogEntry::new(declared.id.clone());
            catalog.name.clone_from(&declared.name);
            catalog.kind.clone_from(&declared.kind);
            addon = addon.with_catalog(catalog);
        }

        let _guard = self.locks.write(profile).await;
        let current = self.gateway.fetch_collection(profile).await?;
        let op = Operation::InsertAddon {
            position: current.len(),
            addon: Box::new(addon.clone()),
        };
        self.gateway.apply_operation(profile, &op).await?;
        info!(profile = %profile, addon = %transport_url, "addon installed");
        Ok(addon)
    }

    /// Fetch and normalize a profile's live collection
    ///
    /// # Errors
    /// Fails if the fetch fails.
    pub async fn fetch_collection(
        &self,
        profile: &ProfileId,
    ) -> Result<AddonCollection, ServiceError> {
        Ok(normalize(&self.gateway.fetch_collection(profile).await?))
    }

    /// Preview the operations a reconciliation run would apply to one
    /// mirror, without applying them
    ///
    /// # Errors
    /// Fails if either collection cannot be fetched.
    pub async fn preview(
        &self,
        master: &ProfileId,
        mirror: &ProfileId,
    ) -> Result<Vec<Operation>, ServiceError> {
        let desired = normalize(&self.gateway.fetch_collection(master).await?);
        let current = normalize(&self.gateway.fetch_collection(mirror).await?);
        Ok(diff(&desired, &current, &self.registry.exclusions(mirror)))
    }

    fn require_profile(&self, id: &ProfileId) -> Result<(), ServiceError> {
        if ProfileStore::new(self.db.connection()).get(id)?.is_none() {
            return Err(ServiceError::ProfileNotFound(id.clone()));
        }
        Ok(())
    }
}
