// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recompute coordination under concurrent lookups.

use std::time::Duration;

use futures::future::join_all;
use linkcache::{CachedStore, ContentionPolicy, InMemoryEngine, Store, StoreError};
use linkcache_tier::testing::{RecordingStore, StoreOp};
use tick::Clock;

const URL: &str = "https://example.com/landing";

fn slow_store(latency: Duration) -> RecordingStore {
    let store = RecordingStore::new();
    store.set_latency(Clock::new_tokio(), latency);
    store
}

fn cache(store: &RecordingStore) -> CachedStore<RecordingStore, InMemoryEngine> {
    CachedStore::builder(store.clone(), Clock::new_tokio()).memory().build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn ten_thousand_lookups_reach_the_store_once() {
    const CALLERS: usize = 10_000;

    let store = slow_store(Duration::from_millis(200));
    store.insert("hot001", URL);
    let cache = cache(&store);

    let tasks: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("hot001").await })
        })
        .collect();

    let mut served = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(url) => {
                assert_eq!(url, URL);
                served += 1;
            }
            Err(error) => {
                assert_eq!(error, StoreError::NotFound);
                rejected += 1;
            }
        }
    }

    assert_eq!(store.get_count(), 1);
    assert!(served >= 1);
    assert_eq!(served + rejected, CALLERS);
    assert!(!cache.engine().permissions().is_held("hot001"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_are_recomputed_independently() {
    let store = RecordingStore::new();
    let keys: Vec<String> = (0..100).map(|i| format!("k{i:05}")).collect();
    for key in &keys {
        store.insert(key.clone(), format!("https://example.com/{key}"));
    }
    let cache = cache(&store);

    let first = join_all(keys.iter().map(|key| cache.get(key))).await;
    assert!(first.iter().all(Result::is_ok));
    assert_eq!(store.get_count(), 100);

    let second = join_all(keys.iter().map(|key| cache.get(key))).await;
    assert_eq!(first, second);
    assert_eq!(store.get_count(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retrying_callers_wait_for_the_recompute() {
    let store = slow_store(Duration::from_millis(100));
    store.insert("hot001", URL);
    let cache = CachedStore::builder(store.clone(), Clock::new_tokio())
        .contention(ContentionPolicy::retry(100, Duration::from_millis(10)))
        .memory()
        .build();

    let results = join_all((0..20).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("hot001").await })
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().unwrap(), URL);
    }
    assert_eq!(store.get_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retrying_callers_give_up_after_their_attempts() {
    let store = slow_store(Duration::from_secs(2));
    store.insert("hot001", URL);
    let cache = CachedStore::builder(store.clone(), Clock::new_tokio())
        .contention(ContentionPolicy::retry(2, Duration::from_millis(10)))
        .memory()
        .build();

    let leader = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("hot001").await }
    });
    while store.get_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(cache.get("hot001").await, Err(StoreError::NotFound));
    assert_eq!(leader.await.unwrap().unwrap(), URL);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_lookup_still_populates_the_cache() {
    let store = slow_store(Duration::from_millis(100));
    store.insert("hot001", URL);
    let cache = cache(&store);

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.get("hot001")).await;
    assert!(abandoned.is_err(), "the lookup should still be waiting on the store");

    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.engine().permissions().is_held("hot001") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("the recompute should finish on its own");

    assert_eq!(cache.get("hot001").await.unwrap(), URL);
    assert_eq!(store.get_count(), 1);
}

#[tokio::test]
async fn panicking_store_releases_the_permission() {
    let store = RecordingStore::new();
    store.insert("hot001", URL);
    store.panic_when(|op| matches!(op, StoreOp::Get(_)));
    let cache = cache(&store);

    let outcome = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("hot001").await }
    })
    .await;
    assert!(outcome.unwrap_err().is_panic());
    assert!(!cache.engine().permissions().is_held("hot001"));

    store.clear_failures();
    assert_eq!(cache.get("hot001").await.unwrap(), URL);
    assert_eq!(store.get_count(), 2);
}
