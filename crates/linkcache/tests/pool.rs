// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Identifier issuing on top of the cache.

use std::collections::HashSet;
use std::time::Duration;

use anyspawn::Spawner;
use linkcache::{CachedStore, IdPool, InMemoryEngine, MemoryStore, Store, StoreError, validate};
use tick::Clock;

type LinkCache = CachedStore<MemoryStore, InMemoryEngine>;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn setup() -> (Clock, LinkCache, IdPool<LinkCache>) {
    let clock = Clock::new_tokio();
    let cache = CachedStore::builder(MemoryStore::new(clock.clone()), clock.clone())
        .memory()
        .name("pool-tests")
        .build();
    let pool = IdPool::new(cache.clone(), Spawner::new_tokio(), clock.clone());
    (clock, cache, pool)
}

async fn wait_until_idle(pool: &IdPool<LinkCache>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while pool.is_reclaiming() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("reclamation should finish");
}

#[tokio::test]
async fn minted_identifier_resolves_through_the_cache() {
    let (clock, cache, pool) = setup();

    let id = pool.get("https://example.com/one", clock.system_time() + DAY).await.unwrap();

    assert_eq!(validate(&id), Ok(()));
    assert_eq!(cache.get(&id).await.unwrap(), "https://example.com/one");
    wait_until_idle(&pool).await;
}

#[tokio::test]
async fn deleted_identifier_is_reissued_with_new_target() {
    let (clock, cache, pool) = setup();
    let expires_at = clock.system_time() + DAY;

    let first = pool.get("https://example.com/one", expires_at).await.unwrap();
    wait_until_idle(&pool).await;
    cache.delete(&first).await.unwrap();
    assert_eq!(cache.get(&first).await, Err(StoreError::NotFound));

    // The pool is empty: this call mints and kicks off a reclamation that finds `first`.
    let second = pool.get("https://example.com/two", expires_at).await.unwrap();
    assert_ne!(second, first);
    wait_until_idle(&pool).await;
    assert_eq!(pool.available(), 1);

    let reused = pool.get("https://example.com/three", expires_at).await.unwrap();

    assert_eq!(reused, first);
    assert_eq!(cache.get(&reused).await.unwrap(), "https://example.com/three");
    assert_eq!(cache.get(&second).await.unwrap(), "https://example.com/two");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuing_never_shares_an_identifier() {
    let (clock, cache, pool) = setup();
    let expires_at = clock.system_time() + DAY;

    let tasks: Vec<_> = (0..200)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.get(&format!("https://example.com/{i}"), expires_at).await })
        })
        .collect();

    let mut issued = HashSet::new();
    for task in tasks {
        let id = task.await.unwrap().unwrap();
        assert!(issued.insert(id));
    }

    wait_until_idle(&pool).await;
    assert_eq!(cache.store().len(), 200);
}
