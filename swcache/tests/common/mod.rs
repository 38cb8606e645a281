#![allow(dead_code)]

use swcache::{CacheManager, PartitionName, Request, Store, StoredResponse, WorkerConfig};
use swcache_test::{CountingStore, FakeTransport};

pub type TestManager = CacheManager<CountingStore, FakeTransport>;

pub const MANIFEST: [&str; 4] = ["/", "/css/styles.css", "/js/app.js", "/offline.html"];

/// An origin serving the manifest plus a few dynamic routes.
pub fn origin() -> FakeTransport {
    FakeTransport::new()
        .respond("/", "<h1>home</h1>")
        .respond("/css/styles.css", "body{}")
        .respond("/js/app.js", "start()")
        .respond("/offline.html", "<h1>offline</h1>")
        .respond("/api/now-playing", r#"{"title":"first"}"#)
        .respond("/schedule", "<h1>schedule</h1>")
}

pub fn config(version: &str) -> WorkerConfig {
    WorkerConfig::builder(version).manifest(MANIFEST).build()
}

pub fn manager(store: CountingStore, transport: FakeTransport) -> TestManager {
    CacheManager::new(store, transport)
}

/// A manager with `v1` installed and active.
pub async fn active_manager() -> (TestManager, CountingStore, FakeTransport) {
    let store = CountingStore::new();
    let transport = origin();
    let manager = manager(store.clone(), transport.clone());
    manager.install(config("v1")).await.unwrap();
    transport.clear_calls();
    store.counters.reset();
    (manager, store, transport)
}

pub fn get(url: &str) -> Request {
    Request::try_get(url).unwrap()
}

pub async fn stored<S: Store>(store: &S, partition: &str, url: &str) -> Option<StoredResponse> {
    store
        .read(&PartitionName::from(partition), &get(url).key())
        .await
        .unwrap()
}

pub async fn partition_names<S: Store>(store: &S) -> Vec<String> {
    store
        .partitions()
        .await
        .unwrap()
        .into_iter()
        .map(|partition| partition.as_str().to_owned())
        .collect()
}
