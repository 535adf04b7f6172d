//! HTTP gateway against the remote collection API
//!
//! The API has no per-operation endpoints; every mutation is a
//! read-modify-write of the whole collection. The gateway fetches the
//! current descriptors, applies the operation locally with the same
//! semantics the diff engine assumed, and posts the result back.

use crate::wire::{
    decode_collection, decode_manifest, encode_collection, AddonDescriptor, ManifestDescriptor,
};
use async_trait::async_trait;
use mirra_core::apply::apply_operation;
use mirra_core::collection::{AddonCollection, AddonManifest, ProfileId};
use mirra_core::diff::Operation;
use mirra_core::gateway::{CollectionGateway, GatewayError};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Default, Deserialize)]
struct CollectionResult {
    #[serde(default)]
    addons: Vec<AddonDescriptor>,
}

/// Gateway speaking the remote collection HTTP API
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: HashMap<ProfileId, String>,
}

impl HttpGateway {
    /// Create a gateway for the API at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: HashMap::new(),
        }
    }

    /// Register a profile's auth key
    pub fn add_credential(&mut self, profile: ProfileId, auth_key: String) {
        self.credentials.insert(profile, auth_key);
    }

    fn auth_key(&self, profile: &ProfileId) -> Result<&str, GatewayError> {
        self.credentials
            .get(profile)
            .map(String::as_str)
            .ok_or_else(|| GatewayError::Auth(profile.clone()))
    }

    async fn get_descriptors(
        &self,
        profile: &ProfileId,
    ) -> Result<Vec<AddonDescriptor>, GatewayError> {
        let auth_key = self.auth_key(profile)?;
        let url = format!("{}/api/addonCollectionGet", self.base_url);
        let body = json!({
            "type": "AddonCollectionGet",
            "authKey": auth_key,
            "update": true,
        });

        let fetch_err = |reason: String| GatewayError::Fetch {
            profile: profile.clone(),
            reason,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let envelope: Envelope<CollectionResult> = response
            .json()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if let Some(error) = envelope.error {
            return Err(fetch_err(format!("API error: {error}")));
        }
        let result = envelope
            .result
            .ok_or_else(|| fetch_err("empty API response".to_string()))?;
        debug!(profile = %profile, addons = result.addons.len(), "fetched descriptors");
        Ok(result.addons)
    }

    async fn set_descriptors(
        &self,
        profile: &ProfileId,
        descriptors: &[AddonDescriptor],
    ) -> Result<(), GatewayError> {
        let auth_key = self.auth_key(profile)?;
        let url = format!("{}/api/addonCollectionSet", self.base_url);
        let body = json!({
            "type": "AddonCollectionSet",
            "authKey": auth_key,
            "addons": descriptors,
        });

        let apply_err = |reason: String| GatewayError::Apply {
            profile: profile.clone(),
            reason,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| apply_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(apply_err(format!("HTTP {status}")));
        }
        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| apply_err(e.to_string()))?;
        if let Some(error) = envelope.error {
            return Err(apply_err(format!("API error: {error}")));
        }
        Ok(())
    }

    /// Fill in catalog metadata the collection itself cannot supply
    ///
    /// Enabling a catalog the remote list no longer carries leaves a
    /// bare id; the addon's manifest still declares its name and type.
    async fn enrich_catalog(
        &self,
        collection: &mut AddonCollection,
        op: &Operation,
    ) -> Result<(), GatewayError> {
        let Operation::SetCatalogEnabled {
            addon,
            catalog,
            enabled: true,
        } = op
        else {
            return Ok(());
        };
        let Some(index) = collection.resolve(addon) else {
            return Ok(());
        };
        let entry = &collection.addons[index];
        let Some(cat_index) = entry
            .catalogs
            .iter()
            .position(|c| c.key() == *catalog && c.name.is_none())
        else {
            return Ok(());
        };

        let manifest = self.fetch_manifest(&entry.transport_url).await?;
        if let Some(declared) = manifest.catalogs.iter().find(|c| c.key() == *catalog) {
            let slot = &mut collection.addons[index].catalogs[cat_index];
            slot.name.clone_from(&declared.name);
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionGateway for HttpGateway {
    async fn fetch_collection(&self, profile: &ProfileId) -> Result<AddonCollection, GatewayError> {
        Ok(decode_collection(self.get_descriptors(profile).await?))
    }

    async fn apply_operation(
        &self,
        profile: &ProfileId,
        operation: &Operation,
    ) -> Result<(), GatewayError> {
        let mut collection = decode_collection(self.get_descriptors(profile).await?);
        apply_operation(&mut collection, operation).map_err(|e| GatewayError::Apply {
            profile: profile.clone(),
            reason: e.to_string(),
        })?;
        self.enrich_catalog(&mut collection, operation).await?;
        self.set_descriptors(profile, &encode_collection(&collection))
            .await
    }

    async fn fetch_manifest(&self, transport_url: &str) -> Result<AddonManifest, GatewayError> {
        let manifest_err = |reason: String| GatewayError::Manifest {
            url: transport_url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(transport_url)
            .send()
            .await
            .map_err(|e| manifest_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(manifest_err(format!("HTTP {status}")));
        }
        let descriptor: ManifestDescriptor = response
            .json()
            .await
            .map_err(|e| manifest_err(e.to_string()))?;
        Ok(decode_manifest(descriptor))
    }
}
