//! Walks the radio worker config through install, an offline spell and an
//! upgrade, against a scripted origin.
//!
//! Run with `RUST_LOG=swcache=debug cargo run -p swcache --example radio_offline`.

use swcache::{CacheManager, LifecycleEvent, Request, WorkerConfig};
use swcache_moka::MokaStore;
use swcache_test::FakeTransport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swcache=info")),
        )
        .init();

    let config = WorkerConfig::from_path(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/radio.yaml"
    ))?;
    let origin = config
        .manifest
        .iter()
        .fold(FakeTransport::new(), |origin, url| {
            origin.respond(url, format!("contents of {url}"))
        })
        .respond("/api/now-playing", r#"{"title":"Blue in Green"}"#)
        .respond("/schedule", "<h1>schedule</h1>");

    let store = MokaStore::builder()
        .label("radio")
        .partition_capacity(config.dynamic_partition.as_str(), 500)
        .build();
    let manager = CacheManager::new(store, origin.clone());
    let mut events = manager.subscribe();

    manager.install(config.clone()).await?;
    println!("active version: {:?}", manager.version().await);

    for url in ["/css/styles.css", "/api/now-playing", "/schedule"] {
        let fetched = manager.fetch(&Request::try_get(url)?).await?;
        println!("online  {url:<20} {} from {}", fetched.response.status(), fetched.source);
    }
    manager.offload().wait_all().await;

    origin.set_offline(true);
    for url in [
        "/css/styles.css",
        "/api/now-playing",
        "/favorites",
        "https://stream.example/live.mp3",
    ] {
        let fetched = manager.fetch(&Request::try_get(url)?).await?;
        println!("offline {url:<20} {} from {}", fetched.response.status(), fetched.source);
    }
    origin.set_offline(false);

    let mut next = config;
    next.version = "radio-pwa-v1.1.0".to_owned();
    manager.client_connected().await;
    manager.install(next).await?;
    if let Some(reply) = manager.handle_json(r#"{"type":"GET_VERSION"}"#).await? {
        println!("after upgrade: {reply}");
    }

    while let Ok(event) = events.try_recv() {
        match event {
            LifecycleEvent::UpdateAvailable { version, .. } => println!("update available: {version}"),
            LifecycleEvent::Activated { version, .. } => println!("activated: {version}"),
            LifecycleEvent::InstallFailed { version, .. } => println!("install failed: {version}"),
        }
    }
    Ok(())
}
