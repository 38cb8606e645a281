//! Tests for partition handling and capacity bounds.

use chrono::Utc;
use swcache_backend::{DeleteStatus, PartitionName, Store};
use swcache_core::{RequestKey, Response, StoredResponse};
use swcache_moka::MokaStore;

fn make_key(id: u32) -> RequestKey {
    RequestKey::get(format!("/api/history?page={id}"))
}

fn make_value(size: usize) -> StoredResponse {
    StoredResponse::new(Response::ok(vec![0u8; size]), Utc::now())
}

#[tokio::test]
async fn bounded_partition_never_exceeds_capacity() {
    let store = MokaStore::builder()
        .partition_capacity("dynamic", 3)
        .build();
    let dynamic = PartitionName::from("dynamic");

    for i in 1..=10 {
        store.write(&dynamic, &make_key(i), make_value(16)).await.unwrap();
    }
    store.run_pending_tasks().await;

    let count = store.entry_count(&dynamic).unwrap();
    assert!(count <= 3, "dynamic partition holds {count} entries, capacity is 3");
}

#[tokio::test]
async fn unlisted_partition_is_unbounded_by_default() {
    let store = MokaStore::builder()
        .partition_capacity("dynamic", 2)
        .build();
    let static_partition = PartitionName::from("v1-static");

    for i in 1..=20 {
        store
            .write(&static_partition, &make_key(i), make_value(16))
            .await
            .unwrap();
    }
    store.run_pending_tasks().await;

    assert_eq!(store.entry_count(&static_partition), Some(20));
    assert_eq!(store.keys(&static_partition).await.unwrap().len(), 20);
}

#[tokio::test]
async fn default_capacity_skips_batch_written_partitions() {
    let store = MokaStore::builder().default_capacity(2).build();
    let static_partition = PartitionName::from("v1-static");
    let dynamic = PartitionName::from("dynamic");

    let batch = (1..=8).map(|i| (make_key(i), make_value(16))).collect();
    store.write_all(&static_partition, batch).await.unwrap();
    for i in 1..=8 {
        store.write(&dynamic, &make_key(i), make_value(16)).await.unwrap();
    }
    store.run_pending_tasks().await;

    assert_eq!(store.entry_count(&static_partition), Some(8));
    let count = store.entry_count(&dynamic).unwrap();
    assert!(count <= 2, "dynamic partition holds {count} entries, default is 2");
}

#[tokio::test]
async fn explicit_capacity_still_bounds_batch_writes() {
    let store = MokaStore::builder()
        .default_capacity(100)
        .partition_capacity("v1-static", 3)
        .build();
    let static_partition = PartitionName::from("v1-static");

    let batch = (1..=10).map(|i| (make_key(i), make_value(16))).collect();
    store.write_all(&static_partition, batch).await.unwrap();
    store.run_pending_tasks().await;

    let count = store.entry_count(&static_partition).unwrap();
    assert!(count <= 3, "static partition holds {count} entries, capacity is 3");
}

#[tokio::test]
async fn read_does_not_create_partition() {
    let store = MokaStore::builder().build();
    let missing = PartitionName::from("v9-static");

    assert!(store.read(&missing, &make_key(1)).await.unwrap().is_none());
    assert!(store.partitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_partition_drops_entries() {
    let store = MokaStore::builder().build();
    let old = PartitionName::from("v1-static");
    let current = PartitionName::from("v2-static");

    store.write(&old, &make_key(1), make_value(8)).await.unwrap();
    store.write(&old, &make_key(2), make_value(8)).await.unwrap();
    store.write(&current, &make_key(1), make_value(8)).await.unwrap();

    assert_eq!(
        store.delete_partition(&old).await.unwrap(),
        DeleteStatus::Deleted(2)
    );
    assert_eq!(store.partitions().await.unwrap(), vec![current.clone()]);
    assert!(store.read(&old, &make_key(1)).await.unwrap().is_none());
    assert!(store.read(&current, &make_key(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn latest_write_wins() {
    let store = MokaStore::builder().build();
    let dynamic = PartitionName::from("dynamic");
    let key = RequestKey::get("/api/now-playing");

    store
        .write(&dynamic, &key, StoredResponse::new(Response::ok("old"), Utc::now()))
        .await
        .unwrap();
    store
        .write(&dynamic, &key, StoredResponse::new(Response::ok("new"), Utc::now()))
        .await
        .unwrap();

    let stored = store.read(&dynamic, &key).await.unwrap().unwrap();
    assert_eq!(stored.response().body().as_ref(), b"new");
}
