// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-through and write-through behavior of `CachedStore`.

use std::time::Duration;

use anyspawn::Spawner;
use linkcache::{CacheConfig, CachedStore, Engine, Entry, InMemoryEngine, MemoryStore, Store, StoreError};
use linkcache_tier::testing::{EngineOp, MockEngine, RecordingStore, StoreOp};
use tick::{Clock, ClockControl};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::test]
async fn created_record_is_served_from_cache() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    let cache = CachedStore::builder(store.clone(), clock.clone()).memory().build();

    cache
        .create("abc123", "http://example.com", clock.system_time() + DAY)
        .await
        .unwrap();

    assert_eq!(cache.get("abc123").await.unwrap(), "http://example.com");
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn updated_record_replaces_cached_url() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    let cache = CachedStore::builder(store.clone(), clock.clone()).memory().build();
    let expires_at = clock.system_time() + DAY;

    cache.create("abc123", "https://old.example", expires_at).await.unwrap();
    cache.update("abc123", "https://new.example", expires_at).await.unwrap();

    assert_eq!(cache.get("abc123").await.unwrap(), "https://new.example");
    assert_eq!(store.get_count(), 0);
}

#[tokio::test]
async fn failed_write_leaves_cache_untouched() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    store.fail_when(|op| matches!(op, StoreOp::Create { .. }));
    let engine = MockEngine::new();
    let cache = CachedStore::builder(store.clone(), clock.clone())
        .engine(engine.clone())
        .build();

    let error = cache
        .create("abc123", "http://example.com", clock.system_time() + DAY)
        .await
        .unwrap_err();

    assert_eq!(error, StoreError::failed("injected store failure"));
    assert!(engine.operations().is_empty());
    assert_eq!(engine.entry("abc123"), None);

    store.clear_failures();
    assert_eq!(cache.get("abc123").await, Err(StoreError::NotFound));
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn negative_result_is_cached_until_it_expires() {
    let control = ClockControl::new();
    let clock = control.to_clock();
    let store = RecordingStore::new();
    let cache = CachedStore::builder(store.clone(), clock.clone())
        .negative_ttl(Duration::from_secs(60))
        .memory()
        .build();

    assert_eq!(cache.get("later1").await, Err(StoreError::NotFound));
    assert_eq!(cache.get("later1").await, Err(StoreError::NotFound));
    assert_eq!(store.get_count(), 1);

    // Appears in the store behind the cache's back; the negative entry still wins.
    store.insert("later1", "https://example.com");
    control.advance(Duration::from_secs(59));
    assert_eq!(cache.get("later1").await, Err(StoreError::NotFound));
    assert_eq!(store.get_count(), 1);

    control.advance(Duration::from_secs(2));
    assert_eq!(cache.get("later1").await.unwrap(), "https://example.com");
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn cached_failure_is_reproduced_verbatim() {
    let control = ClockControl::new();
    let store = RecordingStore::new();
    store.fail_when(|op| matches!(op, StoreOp::Get(_)));
    let cache = CachedStore::builder(store.clone(), control.to_clock()).memory().build();

    let first = cache.get("abc123").await.unwrap_err();
    store.clear_failures();
    let second = cache.get("abc123").await.unwrap_err();

    assert_eq!(first, StoreError::failed("injected store failure"));
    assert_eq!(first, second);
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn broken_engine_degrades_to_store_reads() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    let engine = MockEngine::new();
    engine.fail_when(|_| true);
    let cache = CachedStore::builder(store.clone(), clock.clone())
        .engine(engine.clone())
        .logs(false)
        .build();

    cache
        .create("abc123", "https://example.com", clock.system_time() + DAY)
        .await
        .unwrap();
    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(cache.get("nohere").await, Err(StoreError::NotFound));
    cache.delete("abc123").await.unwrap();

    assert_eq!(store.get_count(), 3);
    assert!(engine.count(|op| matches!(op, EngineOp::Acquire(_))) >= 3);
}

#[tokio::test]
async fn failing_engine_writes_do_not_fail_lookups() {
    let control = ClockControl::new();
    let store = RecordingStore::new();
    store.insert("abc123", "https://example.com");
    let engine = MockEngine::new();
    engine.fail_when(|op| matches!(op, EngineOp::Set { .. } | EngineOp::Release(_)));
    let cache = CachedStore::builder(store.clone(), control.to_clock())
        .engine(engine.clone())
        .build();

    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(engine.entry("abc123"), None);
}

#[tokio::test]
async fn deleted_record_is_not_served_from_cache() {
    let clock = Clock::new_tokio();
    let store = MemoryStore::new(clock.clone());
    let cache = CachedStore::builder(store, clock.clone()).memory().build();

    cache
        .create("abc123", "https://example.com", clock.system_time() + DAY)
        .await
        .unwrap();
    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");

    cache.delete("abc123").await.unwrap();

    assert_eq!(cache.get("abc123").await, Err(StoreError::NotFound));
    assert_eq!(cache.delete("abc123").await, Err(StoreError::NotFound));
}

#[tokio::test]
async fn config_driven_memory_engine() {
    let clock = Clock::new_tokio();
    let config: CacheConfig = serde_json::from_str(
        r#"{
            "found_ttl_secs": 120,
            "negative_ttl_secs": 5,
            "sweep_interval_secs": 0,
            "max_capacity": 1000
        }"#,
    )
    .unwrap();

    let engine = Engine::from_config(&config, clock.clone(), &Spawner::new_tokio())
        .await
        .unwrap();
    let store = RecordingStore::new();
    store.insert("abc123", "https://example.com");
    let cache = CachedStore::builder(store.clone(), clock)
        .config(&config)
        .engine(engine)
        .build();

    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(cache.get("abc123").await.unwrap(), "https://example.com");
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn engine_entry_matches_store_outcome() {
    let control = ClockControl::new();
    let store = RecordingStore::new();
    store.insert("abc123", "https://example.com");
    let engine = InMemoryEngine::new(control.to_clock());
    let cache = CachedStore::builder(store, control.to_clock())
        .engine(engine.clone())
        .build();

    cache.get("abc123").await.unwrap();
    cache.get("nohere").await.unwrap_err();

    assert_eq!(
        linkcache::CacheEngine::get(&engine, "abc123").await.unwrap(),
        Some(Entry::found("https://example.com"))
    );
    assert_eq!(
        linkcache::CacheEngine::get(&engine, "nohere").await.unwrap(),
        Some(Entry::failed(StoreError::NotFound))
    );
}

async fn wait_for_store_read(store: &RecordingStore) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.get_count() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("the lookup should reach the store");
}

#[tokio::test]
async fn delete_during_recompute_is_not_undone() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    store.insert("abc123", "https://old.example");
    store.delay_reads(clock.clone(), Duration::from_millis(200));
    let cache = CachedStore::builder(store.clone(), clock).memory().build();

    let lookup = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("abc123").await }
    });
    wait_for_store_read(&store).await;
    cache.delete("abc123").await.unwrap();

    // The lookup read the row before it was deleted.
    assert_eq!(lookup.await.unwrap().unwrap(), "https://old.example");

    assert_eq!(cache.get("abc123").await, Err(StoreError::NotFound));
    assert_eq!(store.get_count(), 2);
}

#[tokio::test]
async fn update_during_recompute_is_not_overwritten() {
    let clock = Clock::new_tokio();
    let store = RecordingStore::new();
    store.delay_reads(clock.clone(), Duration::from_millis(200));
    let cache = CachedStore::builder(store.clone(), clock.clone()).memory().build();

    let lookup = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("abc123").await }
    });
    wait_for_store_read(&store).await;
    cache
        .update("abc123", "https://new.example", clock.system_time() + DAY)
        .await
        .unwrap();

    assert_eq!(lookup.await.unwrap(), Err(StoreError::NotFound));

    assert_eq!(cache.get("abc123").await.unwrap(), "https://new.example");
    assert_eq!(store.get_count(), 1);
}
