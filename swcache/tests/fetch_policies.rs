//! Behaviour of the four fetch strategies through `CacheManager::fetch`.

mod common;

use chrono::{DateTime, TimeDelta, Utc};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use swcache::{
    CacheManager, FetchError, Request, RequestClass, Response, ResponseSource, Strategy,
    TransportError, WorkerConfig,
};
use swcache_test::{CountingStore, ManualClock};

use common::{active_manager, get, origin, stored};

#[tokio::test]
async fn static_hit_is_served_before_the_background_refresh() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("/css/styles.css", Response::ok("body{color:red}"));

    let fetched = manager.fetch(&get("/css/styles.css")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Cache);
    assert_eq!(fetched.response.body().as_ref(), b"body{}");
    assert_eq!(transport.call_count("/css/styles.css"), 0);

    manager.offload().wait_all().await;
    assert_eq!(transport.call_count("/css/styles.css"), 1);
    let refreshed = stored(&store, "v1-static", "/css/styles.css").await.unwrap();
    assert_eq!(refreshed.response().body().as_ref(), b"body{color:red}");

    let next = manager.fetch(&get("/css/styles.css")).await.unwrap();
    assert_eq!(next.source, ResponseSource::Cache);
    assert_eq!(next.response.body().as_ref(), b"body{color:red}");
    manager.offload().wait_all().await;
}

#[tokio::test]
async fn failed_refresh_keeps_the_cached_entry() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("/js/app.js", Response::new(StatusCode::INTERNAL_SERVER_ERROR));

    manager.fetch(&get("/js/app.js")).await.unwrap();
    manager.offload().wait_all().await;

    let entry = stored(&store, "v1-static", "/js/app.js").await.unwrap();
    assert_eq!(entry.response().body().as_ref(), b"start()");
}

#[tokio::test]
async fn static_miss_is_fetched_into_the_static_partition() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("/images/cover.png", Response::ok("png"));

    let fetched = manager.fetch(&get("/images/cover.png")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert!(stored(&store, "v1-static", "/images/cover.png").await.is_some());
    assert!(stored(&store, "dynamic", "/images/cover.png").await.is_none());
}

#[tokio::test]
async fn static_miss_offline_propagates_the_transport_error() {
    let (manager, _store, transport) = active_manager().await;
    transport.set_offline(true);

    let error = manager.fetch(&get("/images/missing.png")).await.unwrap_err();
    assert!(matches!(error.transport(), TransportError::Connect(_)));
}

#[tokio::test]
async fn api_success_updates_the_dynamic_partition() {
    let (manager, store, transport) = active_manager().await;

    let first = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(
        stored(&store, "dynamic", "/api/now-playing").await.unwrap().into_response(),
        first.response
    );

    transport.set_response("/api/now-playing", Response::ok(r#"{"title":"second"}"#));
    let second = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(second.source, ResponseSource::Network);
    assert_eq!(
        stored(&store, "dynamic", "/api/now-playing").await.unwrap().into_response(),
        second.response
    );
}

#[tokio::test]
async fn api_transport_failure_returns_the_cached_entry_unchanged() {
    let (manager, _store, transport) = active_manager().await;
    let online = manager.fetch(&get("/api/now-playing")).await.unwrap();

    transport.set_offline(true);
    let offline = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(offline.source, ResponseSource::Cache);
    assert_eq!(offline.response, online.response);
}

#[tokio::test]
async fn api_transport_failure_without_entry_propagates() {
    let (manager, _store, transport) = active_manager().await;
    transport.set_offline(true);

    let error = manager.fetch(&get("/api/history")).await.unwrap_err();
    let FetchError::Transport { key, .. } = error;
    assert_eq!(key.url(), "/api/history");
}

#[tokio::test]
async fn api_error_status_passes_through_and_is_not_cached() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("/api/history", Response::new(StatusCode::SERVICE_UNAVAILABLE));

    let fetched = manager.fetch(&get("/api/history")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(fetched.response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(stored(&store, "dynamic", "/api/history").await.is_none());
}

#[tokio::test]
async fn server_error_passes_through_even_with_cached_entry() {
    let (manager, _store, transport) = active_manager().await;
    manager.fetch(&get("/api/now-playing")).await.unwrap();

    transport.set_response("/api/now-playing", Response::new(StatusCode::BAD_GATEWAY));
    let fetched = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(fetched.response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn server_error_falls_back_when_enabled() {
    let transport = origin();
    let manager = CacheManager::new(CountingStore::new(), transport.clone());
    let config = WorkerConfig::builder("v1")
        .manifest(common::MANIFEST)
        .fallback_on_server_error(true)
        .build();
    manager.install(config).await.unwrap();

    let online = manager.fetch(&get("/api/now-playing")).await.unwrap();
    transport.set_response("/api/now-playing", Response::new(StatusCode::BAD_GATEWAY));

    let fetched = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Cache);
    assert_eq!(fetched.response, online.response);

    // Client errors are never replaced.
    transport.set_response("/api/now-playing", Response::new(StatusCode::NOT_FOUND));
    let fetched = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(fetched.response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn navigation_prefers_cached_page_over_offline_page() {
    let (manager, _store, transport) = active_manager().await;
    let online = manager.fetch(&get("/schedule")).await.unwrap();
    assert_eq!(online.source, ResponseSource::Network);

    transport.set_offline(true);
    let offline = manager.fetch(&get("/schedule")).await.unwrap();
    assert_eq!(offline.source, ResponseSource::Cache);
    assert_eq!(offline.response, online.response);
}

#[tokio::test]
async fn navigation_without_network_or_cache_gets_exactly_the_offline_page() {
    let (manager, store, transport) = active_manager().await;
    transport.set_offline(true);

    let fetched = manager.fetch(&get("/about")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::OfflineFallback);
    let offline_page = stored(&store, "v1-static", "/offline.html").await.unwrap();
    assert_eq!(fetched.response, offline_page.into_response());
}

#[tokio::test]
async fn navigation_without_offline_page_propagates() {
    let transport = origin();
    let manager = CacheManager::new(CountingStore::new(), transport.clone());
    manager
        .install(WorkerConfig::builder("v1").manifest(["/", "/css/styles.css"]).build())
        .await
        .unwrap();
    transport.set_offline(true);

    assert!(manager.fetch(&get("/about")).await.is_err());
}

#[tokio::test]
async fn streaming_never_touches_a_partition() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("https://cdn.example/live/stream", Response::ok("audio"));

    let live = manager
        .fetch(&get("https://cdn.example/live/stream"))
        .await
        .unwrap();
    assert_eq!(live.source, ResponseSource::Network);
    assert_eq!(live.response.body().as_ref(), b"audio");

    transport.set_offline(true);
    let unavailable = manager.fetch(&get("/media/jingle.mp3")).await.unwrap();
    assert_eq!(unavailable.source, ResponseSource::Synthesized);
    assert_eq!(unavailable.response, Response::unavailable());
    assert_eq!(unavailable.response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        unavailable.response.body().as_ref(),
        b"Offline - No streaming available"
    );

    assert_eq!(store.entry_accesses(), 0);
}

#[tokio::test]
async fn non_http_schemes_bypass_the_manager() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("chrome-extension://abcdef/popup.js", Response::ok("ext"));

    let fetched = manager
        .fetch(&get("chrome-extension://abcdef/popup.js"))
        .await
        .unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(store.entry_accesses(), 0);
}

#[tokio::test]
async fn without_active_worker_requests_pass_through() {
    let store = CountingStore::new();
    let transport = origin();
    let manager = CacheManager::new(store.clone(), transport.clone());

    let fetched = manager.fetch(&get("/css/styles.css")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(store.entry_accesses(), 0);

    transport.set_offline(true);
    assert!(manager.fetch(&get("/css/styles.css")).await.is_err());
}

#[tokio::test]
async fn non_get_requests_are_never_cached() {
    let (manager, store, transport) = active_manager().await;
    transport.set_response("/api/auth/login", Response::ok("token"));
    let login = Request::new(Method::POST, "/api/auth/login".parse().unwrap());

    let fetched = manager.fetch(&login).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(store.writes(), 0);

    transport.set_offline(true);
    assert!(manager.fetch(&login).await.is_err());
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn store_write_failure_does_not_fail_the_response() {
    let (manager, store, _transport) = active_manager().await;
    store.set_fail_writes(true);

    let fetched = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(fetched.source, ResponseSource::Network);
    assert_eq!(store.writes(), 1);
    assert!(stored(&store, "dynamic", "/api/now-playing").await.is_none());
}

#[tokio::test]
async fn entries_are_stamped_with_the_injected_clock() {
    let start: DateTime<Utc> = "2024-03-01T08:00:00Z".parse().unwrap();
    let clock = ManualClock::new(start);
    let store = CountingStore::new();
    let manager = CacheManager::builder(store.clone(), origin())
        .clock(clock.clone())
        .build();
    manager.install(common::config("v1")).await.unwrap();

    clock.advance(TimeDelta::minutes(5));
    manager.fetch(&get("/api/now-playing")).await.unwrap();

    let manifest_entry = stored(&store, "v1-static", "/").await.unwrap();
    assert_eq!(manifest_entry.stored_at(), start);
    let api_entry = stored(&store, "dynamic", "/api/now-playing").await.unwrap();
    assert_eq!(api_entry.stored_at(), start + TimeDelta::minutes(5));
}

#[tokio::test]
async fn strategies_can_be_remapped() {
    let transport = origin();
    let store = CountingStore::new();
    let manager = CacheManager::new(store.clone(), transport.clone());
    let config = WorkerConfig::builder("v1")
        .manifest(common::MANIFEST)
        .strategy(RequestClass::Api, Strategy::CacheFirst)
        .build();
    manager.install(config).await.unwrap();

    let first = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    let second = manager.fetch(&get("/api/now-playing")).await.unwrap();
    assert_eq!(second.source, ResponseSource::Cache);
    manager.offload().wait_all().await;
}
