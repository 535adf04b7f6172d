//! HTTP gateway tests against a mock collection API

use mirra_core::collection::{AddonKey, CatalogKey, ProfileId};
use mirra_core::diff::Operation;
use mirra_core::gateway::{CollectionGateway, GatewayError};
use mirra_gateway::HttpGateway;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile() -> ProfileId {
    ProfileId::from("main")
}

async fn gateway_for(server: &MockServer) -> HttpGateway {
    let mut gateway = HttpGateway::new(server.uri());
    gateway.add_credential(profile(), "test-key".to_string());
    gateway
}

fn sample_addons() -> serde_json::Value {
    json!([
        {
            "transportUrl": "https://a.example/manifest.json",
            "manifest": {
                "id": "org.example.a",
                "name": "A Addon",
                "version": "1.2.3",
                "catalogs": [
                    { "id": "movies", "name": "Movies", "type": "movie" }
                ]
            },
            "flags": { "official": true }
        },
        {
            "transportUrl": "https://b.example/manifest.json",
            "manifest": { "name": "B Addon", "catalogs": [] }
        }
    ])
}

// =============================================================================
// Fetch
// =============================================================================

#[tokio::test]
async fn test_fetch_collection_decodes_descriptors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .and(body_partial_json(json!({ "authKey": "test-key" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": { "addons": sample_addons() } })),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let collection = gateway.fetch_collection(&profile()).await.expect("fetch");

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.addons[0].name, "A Addon");
    assert_eq!(collection.addons[0].catalogs.len(), 1);
    assert!(collection.addons[0].catalogs[0].enabled);
    assert_eq!(
        collection.addons[0].catalogs[0].kind.as_deref(),
        Some("movie")
    );
    // Unrecognized fields survive the decode.
    assert_eq!(
        collection.addons[0].extra.get("flags"),
        Some(&json!({ "official": true }))
    );
    assert_eq!(
        collection.addons[0].manifest_extra.get("version"),
        Some(&json!("1.2.3"))
    );
}

#[tokio::test]
async fn test_fetch_without_credential_is_auth_error() {
    let server = MockServer::start().await;
    let gateway = HttpGateway::new(server.uri());

    let err = gateway.fetch_collection(&profile()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Auth(_)));
}

#[tokio::test]
async fn test_api_error_envelope_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": { "message": "Invalid auth key" } })),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway.fetch_collection(&profile()).await.unwrap_err();
    match err {
        GatewayError::Fetch { reason, .. } => assert!(reason.contains("Invalid auth key")),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_failure_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway.fetch_collection(&profile()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Fetch { .. }));
}

// =============================================================================
// Apply (read-modify-write)
// =============================================================================

#[tokio::test]
async fn test_apply_rename_posts_updated_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": { "addons": sample_addons() } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionSet"))
        .and(body_partial_json(json!({
            "authKey": "test-key",
            "addons": [
                {
                    "transportUrl": "https://a.example/manifest.json",
                    "manifest": { "name": "Renamed", "version": "1.2.3" },
                    "flags": { "official": true }
                },
                { "transportUrl": "https://b.example/manifest.json" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": { "success": true } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    gateway
        .apply_operation(
            &profile(),
            &Operation::RenameAddon {
                addon: AddonKey::first("https://a.example/manifest.json"),
                name: "Renamed".to_string(),
            },
        )
        .await
        .expect("apply");
}

#[tokio::test]
async fn test_disabled_catalog_dropped_from_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": { "addons": sample_addons() } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionSet"))
        .and(body_partial_json(json!({
            "addons": [
                { "manifest": { "name": "A Addon", "catalogs": [] } },
                { "manifest": { "name": "B Addon" } }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": { "success": true } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    gateway
        .apply_operation(
            &profile(),
            &Operation::SetCatalogEnabled {
                addon: AddonKey::first("https://a.example/manifest.json"),
                catalog: CatalogKey::new("movies").with_kind("movie"),
                enabled: false,
            },
        )
        .await
        .expect("apply");
}

#[tokio::test]
async fn test_set_failure_is_apply_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionGet"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": { "addons": sample_addons() } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/addonCollectionSet"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .apply_operation(
            &profile(),
            &Operation::RemoveAddon {
                addon: AddonKey::first("https://b.example/manifest.json"),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Apply { .. }));
}

// =============================================================================
// Manifests
// =============================================================================

#[tokio::test]
async fn test_fetch_manifest_decodes_declared_catalogs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "org.example.c",
            "name": "C Addon",
            "catalogs": [
                { "id": "series", "name": "Series", "type": "series" }
            ]
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let manifest = gateway
        .fetch_manifest(&format!("{}/manifest.json", server.uri()))
        .await
        .expect("manifest");

    assert_eq!(manifest.name, "C Addon");
    assert_eq!(manifest.catalogs.len(), 1);
    assert_eq!(manifest.catalogs[0].kind.as_deref(), Some("series"));
}

#[tokio::test]
async fn test_fetch_manifest_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .fetch_manifest(&format!("{}/manifest.json", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Manifest { .. }));
}
