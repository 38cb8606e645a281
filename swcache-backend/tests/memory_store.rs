use chrono::Utc;
use pretty_assertions::assert_eq;
use swcache_backend::{DeleteStatus, MemoryStore, PartitionName, Store};
use swcache_core::{RequestKey, Response, StoredResponse};

fn entry(body: &'static str) -> StoredResponse {
    StoredResponse::new(Response::ok(body), Utc::now())
}

#[tokio::test]
async fn read_from_missing_partition_is_a_miss() {
    let store = MemoryStore::new();
    let result = store
        .read(&PartitionName::from("v1-static"), &RequestKey::get("/index.html"))
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(store.partitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn write_creates_partition_and_replaces_entries() {
    let store = MemoryStore::new();
    let dynamic = PartitionName::from("dynamic");
    let key = RequestKey::get("/api/now-playing");

    store.write(&dynamic, &key, entry("first")).await.unwrap();
    store.write(&dynamic, &key, entry("second")).await.unwrap();

    let stored = store.read(&dynamic, &key).await.unwrap().unwrap();
    assert_eq!(stored.response().body().as_ref(), b"second");
    assert_eq!(store.len(&dynamic), Some(1));
}

#[tokio::test]
async fn partitions_are_listed_sorted() {
    let store = MemoryStore::new();
    for name in ["v2-static", "dynamic", "v1-static"] {
        store.open(&PartitionName::from(name)).await.unwrap();
    }

    let names: Vec<String> = store
        .partitions()
        .await
        .unwrap()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, vec!["dynamic", "v1-static", "v2-static"]);
}

#[tokio::test]
async fn write_all_lands_every_entry() {
    let store = MemoryStore::new();
    let partition = PartitionName::from("v3-static");
    store
        .write_all(
            &partition,
            vec![
                (RequestKey::get("/a.css"), entry("a")),
                (RequestKey::get("/b.js"), entry("b")),
            ],
        )
        .await
        .unwrap();

    let mut keys: Vec<String> = store
        .keys(&partition)
        .await
        .unwrap()
        .into_iter()
        .map(|key| key.url().to_owned())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["/a.css", "/b.js"]);
}

#[tokio::test]
async fn delete_partition_reports_removed_entries() {
    let store = MemoryStore::new();
    let partition = PartitionName::from("v1-static");
    store
        .write(&partition, &RequestKey::get("/a.css"), entry("a"))
        .await
        .unwrap();
    store
        .write(&partition, &RequestKey::get("/b.js"), entry("b"))
        .await
        .unwrap();

    assert_eq!(
        store.delete_partition(&partition).await.unwrap(),
        DeleteStatus::Deleted(2)
    );
    assert_eq!(
        store.delete_partition(&partition).await.unwrap(),
        DeleteStatus::Missing
    );
    assert!(!store.has_partition(&partition));
}

#[tokio::test]
async fn remove_single_entry() {
    let store = MemoryStore::new();
    let partition = PartitionName::from("dynamic");
    let key = RequestKey::get("/api/schedule");
    store.write(&partition, &key, entry("schedule")).await.unwrap();

    assert_eq!(
        store.remove(&partition, &key).await.unwrap(),
        DeleteStatus::Deleted(1)
    );
    assert_eq!(
        store.remove(&partition, &key).await.unwrap(),
        DeleteStatus::Missing
    );
}

#[tokio::test]
async fn concurrent_writes_to_one_identity_keep_one_entry() {
    let store = MemoryStore::new();
    let partition = PartitionName::from("dynamic");
    let key = RequestKey::get("/api/history");

    let writes = (0..16).map(|_| {
        let store = store.clone();
        let partition = partition.clone();
        let key = key.clone();
        tokio::spawn(async move { store.write(&partition, &key, entry("history")).await })
    });
    for result in futures::future::join_all(writes).await {
        result.unwrap().unwrap();
    }

    assert_eq!(store.len(&partition), Some(1));
}
