//! Shared test fixtures: an in-memory gateway and collection builders

#![allow(dead_code)]

use async_trait::async_trait;
use mirra_core::apply::apply_all;
use mirra_core::collection::{
    AddonCollection, AddonEntry, AddonManifest, CatalogEntry, ProfileId,
};
use mirra_core::diff::Operation;
use mirra_core::gateway::{CollectionGateway, GatewayError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory gateway with fault injection
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    collections: HashMap<ProfileId, AddonCollection>,
    manifests: HashMap<String, AddonManifest>,
    fail_fetch: HashSet<ProfileId>,
    fail_after: Option<usize>,
    applied: Vec<(ProfileId, Operation)>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, profile: impl Into<ProfileId>, collection: AddonCollection) {
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(profile.into(), collection);
    }

    pub fn seed_manifest(&self, url: impl Into<String>, manifest: AddonManifest) {
        self.state
            .lock()
            .unwrap()
            .manifests
            .insert(url.into(), manifest);
    }

    /// Make every fetch of this profile fail
    pub fn fail_fetch(&self, profile: impl Into<ProfileId>) {
        self.state.lock().unwrap().fail_fetch.insert(profile.into());
    }

    pub fn clear_fetch_failures(&self) {
        self.state.lock().unwrap().fail_fetch.clear();
    }

    /// Make apply calls fail after `n` more successes
    pub fn fail_after(&self, n: usize) {
        self.state.lock().unwrap().fail_after = Some(n);
    }

    pub fn clear_apply_failures(&self) {
        self.state.lock().unwrap().fail_after = None;
    }

    pub fn collection(&self, profile: impl Into<ProfileId>) -> AddonCollection {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&profile.into())
            .cloned()
            .unwrap_or_default()
    }

    pub fn applied_count(&self) -> usize {
        self.state.lock().unwrap().applied.len()
    }
}

#[async_trait]
impl CollectionGateway for MemoryGateway {
    async fn fetch_collection(&self, profile: &ProfileId) -> Result<AddonCollection, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.fail_fetch.contains(profile) {
            return Err(GatewayError::Fetch {
                profile: profile.clone(),
                reason: "injected fetch failure".to_string(),
            });
        }
        state
            .collections
            .get(profile)
            .cloned()
            .ok_or_else(|| GatewayError::Fetch {
                profile: profile.clone(),
                reason: "unknown profile".to_string(),
            })
    }

    async fn apply_operation(
        &self,
        profile: &ProfileId,
        operation: &Operation,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.fail_after {
            if remaining == 0 {
                return Err(GatewayError::Apply {
                    profile: profile.clone(),
                    reason: "injected apply failure".to_string(),
                });
            }
            state.fail_after = Some(remaining - 1);
        }
        let mut collection = state.collections.get(profile).cloned().ok_or_else(|| {
            GatewayError::Apply {
                profile: profile.clone(),
                reason: "unknown profile".to_string(),
            }
        })?;
        apply_all(&mut collection, std::slice::from_ref(operation)).map_err(|e| {
            GatewayError::Apply {
                profile: profile.clone(),
                reason: e.to_string(),
            }
        })?;
        state.collections.insert(profile.clone(), collection);
        state.applied.push((profile.clone(), operation.clone()));
        Ok(())
    }

    async fn fetch_manifest(&self, transport_url: &str) -> Result<AddonManifest, GatewayError> {
        self.state
            .lock()
            .unwrap()
            .manifests
            .get(transport_url)
            .cloned()
            .ok_or_else(|| GatewayError::Manifest {
                url: transport_url.to_string(),
                reason: "unknown manifest".to_string(),
            })
    }
}

/// Build an addon with a name derived from its URL
pub fn addon(url: &str) -> AddonEntry {
    let name = url
        .rsplit('/')
        .nth(1)
        .unwrap_or(url)
        .to_string();
    AddonEntry::new(url, name)
}

/// Build an addon with explicit catalogs, each (id, enabled)
pub fn addon_with_catalogs(url: &str, catalogs: &[(&str, bool)]) -> AddonEntry {
    let mut entry = addon(url);
    for (id, enabled) in catalogs {
        entry = entry.with_catalog(CatalogEntry::new(*id).with_enabled(*enabled));
    }
    entry
}

/// Build a collection from addons, assigning positions in order
pub fn collection(addons: Vec<AddonEntry>) -> AddonCollection {
    let mut c = AddonCollection::new();
    for a in addons {
        c.push(a);
    }
    c
}

/// Comparable shape of a collection: (url, name, catalogs as (id, enabled))
pub fn shape(collection: &AddonCollection) -> Vec<(String, String, Vec<(String, bool)>)> {
    collection
        .addons
        .iter()
        .map(|a| {
            (
                a.transport_url.clone(),
                a.name.clone(),
                a.catalogs
                    .iter()
                    .map(|c| (c.id.clone(), c.enabled))
                    .collect(),
            )
        })
        .collect()
}
