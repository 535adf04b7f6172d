//! Wire codec for the remote collection API
//!
//! The remote service exchanges addon descriptors: a transport URL plus
//! an embedded manifest whose catalog list carries only the catalogs
//! currently enabled. The local model keeps disabled catalogs around;
//! serializing drops them, so disabling a catalog is a removal from the
//! remote list. Unrecognized fields are carried opaquely in both
//! directions so a read-modify-write cycle never loses data.

use mirra_core::collection::{
    AddonCollection, AddonEntry, AddonManifest, CatalogEntry, DeclaredCatalog,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bookkeeping key some older tools leave inside manifests; never
/// forwarded to the remote service.
const LEGACY_CATALOG_LIST_KEY: &str = "_master_catalog_list";

/// One addon as the remote API represents it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonDescriptor {
    pub transport_url: String,
    pub manifest: ManifestDescriptor,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// The manifest embedded in an addon descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub catalogs: Vec<CatalogDescriptor>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// A catalog as declared inside a wire manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// Decode a list of wire descriptors into the local model
#[must_use]
pub fn decode_collection(descriptors: Vec<AddonDescriptor>) -> AddonCollection {
    let mut collection = AddonCollection::new();
    for descriptor in descriptors {
        collection.push(decode_addon(descriptor));
    }
    collection
}

fn decode_addon(descriptor: AddonDescriptor) -> AddonEntry {
    let mut addon = AddonEntry::new(descriptor.transport_url, descriptor.manifest.name);
    addon.extra = descriptor.extra;
    addon.manifest_extra = descriptor.manifest.extra;
    addon.manifest_extra.remove(LEGACY_CATALOG_LIST_KEY);
    if let Some(id) = descriptor.manifest.id {
        addon
            .manifest_extra
            .insert("id".to_string(), Value::String(id));
    }
    for (position, catalog) in descriptor.manifest.catalogs.into_iter().enumerate() {
        let mut entry = CatalogEntry::new(catalog.id);
        entry.name = catalog.name;
        entry.kind = catalog.kind;
        entry.position = position;
        entry.extra = catalog.extra;
        addon.catalogs.push(entry);
    }
    addon
}

/// Encode the local model back to wire descriptors
///
/// Disabled catalogs are omitted; the remote service only ever sees the
/// enabled membership list.
#[must_use]
pub fn encode_collection(collection: &AddonCollection) -> Vec<AddonDescriptor> {
    collection.addons.iter().map(encode_addon).collect()
}

fn encode_addon(addon: &AddonEntry) -> AddonDescriptor {
    let mut manifest_extra = addon.manifest_extra.clone();
    manifest_extra.remove(LEGACY_CATALOG_LIST_KEY);
    let id = match manifest_extra.remove("id") {
        Some(Value::String(id)) => Some(id),
        Some(other) => {
            manifest_extra.insert("id".to_string(), other);
            None
        }
        None => None,
    };

    AddonDescriptor {
        transport_url: addon.transport_url.clone(),
        manifest: ManifestDescriptor {
            id,
            name: addon.name.clone(),
            catalogs: addon
                .catalogs
                .iter()
                .filter(|c| c.enabled)
                .map(|c| CatalogDescriptor {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    kind: c.kind.clone(),
                    extra: c.extra.clone(),
                })
                .collect(),
            extra: manifest_extra,
        },
        extra: addon.extra.clone(),
    }
}

/// Decode a standalone manifest document into the model's declared shape
#[must_use]
pub fn decode_manifest(descriptor: ManifestDescriptor) -> AddonManifest {
    AddonManifest {
        id: descriptor.id,
        name: descriptor.name,
        catalogs: descriptor
            .catalogs
            .into_iter()
            .map(|c| DeclaredCatalog {
                id: c.id,
                name: c.name,
                kind: c.kind,
            })
            .collect(),
    }
}
