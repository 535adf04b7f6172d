//! Snapshot capture and restore tests

mod common;

use common::{addon, addon_with_catalogs, collection, shape, MemoryGateway};
use mirra_core::backup::{create_snapshot, restore_snapshot, BackupError};
use mirra_core::collection::ProfileId;
use mirra_core::reconcile::{CancelFlag, MirrorOutcome, ProfileLocks};
use mirra_core::storage::{Database, SnapshotStore};
use uuid::Uuid;

const URL_A: &str = "https://a.example/manifest.json";
const URL_B: &str = "https://b.example/manifest.json";

fn profile() -> ProfileId {
    ProfileId::from("main")
}

// =============================================================================
// Creation and Listing
// =============================================================================

#[tokio::test]
async fn test_create_snapshot_captures_collection() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A), addon(URL_B)]));
    let db = Database::in_memory().expect("db");

    let snapshot = create_snapshot(&gateway, &db, &profile(), "before upgrade".to_string())
        .await
        .expect("create");

    assert_eq!(snapshot.collection.len(), 2);
    assert!(snapshot.verify().expect("verify"));

    let summaries = SnapshotStore::new(db.connection())
        .list(&profile())
        .expect("list");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].description, "before upgrade");
    assert_eq!(summaries[0].addon_count, 2);
}

#[tokio::test]
async fn test_snapshots_listed_oldest_first() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    let db = Database::in_memory().expect("db");

    let first = create_snapshot(&gateway, &db, &profile(), "first".to_string())
        .await
        .expect("create");
    let second = create_snapshot(&gateway, &db, &profile(), "second".to_string())
        .await
        .expect("create");

    let summaries = SnapshotStore::new(db.connection())
        .list(&profile())
        .expect("list");
    let ids: Vec<Uuid> = summaries.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn test_failed_fetch_stores_nothing() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    gateway.fail_fetch("main");
    let db = Database::in_memory().expect("db");

    let result = create_snapshot(&gateway, &db, &profile(), "doomed".to_string()).await;

    assert!(matches!(result, Err(BackupError::Gateway(_))));
    let summaries = SnapshotStore::new(db.connection())
        .list(&profile())
        .expect("list");
    assert!(summaries.is_empty());
}

// =============================================================================
// Restore
// =============================================================================

#[tokio::test]
async fn test_restore_brings_collection_back() {
    let gateway = MemoryGateway::new();
    let original = collection(vec![
        addon_with_catalogs(URL_A, &[("movies", true)]),
        addon(URL_B),
    ]);
    gateway.seed("main", original.clone());
    let db = Database::in_memory().expect("db");
    let locks = ProfileLocks::new();

    let snapshot = create_snapshot(&gateway, &db, &profile(), "baseline".to_string())
        .await
        .expect("create");

    // Drift: the live collection loses an addon.
    gateway.seed("main", collection(vec![addon(URL_B)]));

    let outcome = restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        snapshot.id,
        &CancelFlag::new(),
    )
    .await
    .expect("restore");

    assert!(outcome.is_synced());
    assert_eq!(shape(&gateway.collection("main")), shape(&original));
}

#[tokio::test]
async fn test_restore_then_snapshot_diff_is_empty() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    let db = Database::in_memory().expect("db");
    let locks = ProfileLocks::new();

    let snapshot = create_snapshot(&gateway, &db, &profile(), "baseline".to_string())
        .await
        .expect("create");
    gateway.seed("main", collection(vec![]));

    restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        snapshot.id,
        &CancelFlag::new(),
    )
    .await
    .expect("first restore");

    // Restoring again finds nothing to do.
    let outcome = restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        snapshot.id,
        &CancelFlag::new(),
    )
    .await
    .expect("second restore");

    match outcome {
        MirrorOutcome::Synced { applied } => assert!(applied.is_empty()),
        other => panic!("expected synced, got {other:?}"),
    }
}

#[tokio::test]
async fn test_restore_unknown_snapshot_fails() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![]));
    let db = Database::in_memory().expect("db");
    let locks = ProfileLocks::new();

    let result = restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        Uuid::new_v4(),
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(BackupError::NotFound(_))));
}

#[tokio::test]
async fn test_restore_rejects_tampered_snapshot() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    let db = Database::in_memory().expect("db");
    let locks = ProfileLocks::new();

    let snapshot = create_snapshot(&gateway, &db, &profile(), "baseline".to_string())
        .await
        .expect("create");

    // Corrupt the stored payload behind the checksum's back.
    db.connection()
        .execute(
            "UPDATE snapshots SET data = '{\"addons\":[]}' WHERE id = ?1",
            [snapshot.id.to_string()],
        )
        .expect("tamper");

    let result = restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        snapshot.id,
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(BackupError::Corrupt { .. })));
    // The live collection was never touched.
    assert_eq!(gateway.collection("main").len(), 1);
}

#[tokio::test]
async fn test_restore_fetch_failure_is_an_outcome() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    let db = Database::in_memory().expect("db");
    let locks = ProfileLocks::new();

    let snapshot = create_snapshot(&gateway, &db, &profile(), "baseline".to_string())
        .await
        .expect("create");
    gateway.fail_fetch("main");

    let outcome = restore_snapshot(
        &gateway,
        &db,
        &locks,
        &profile(),
        snapshot.id,
        &CancelFlag::new(),
    )
    .await
    .expect("snapshot itself is fine");

    assert!(matches!(outcome, MirrorOutcome::FetchFailed { .. }));
}

// =============================================================================
// Snapshot Store Maintenance
// =============================================================================

#[tokio::test]
async fn test_rename_and_delete_snapshot() {
    let gateway = MemoryGateway::new();
    gateway.seed("main", collection(vec![addon(URL_A)]));
    let db = Database::in_memory().expect("db");

    let snapshot = create_snapshot(&gateway, &db, &profile(), "old name".to_string())
        .await
        .expect("create");

    let store = SnapshotStore::new(db.connection());
    assert!(store.rename(snapshot.id, "new name").expect("rename"));
    assert_eq!(
        store.list(&profile()).expect("list")[0].description,
        "new name"
    );

    assert!(store.delete(snapshot.id).expect("delete"));
    assert!(store.list(&profile()).expect("list").is_empty());
    assert!(!store.delete(snapshot.id).expect("second delete"));
}
