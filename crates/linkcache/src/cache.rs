// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The caching decorator.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyspawn::Spawner;
use futures::FutureExt;
use linkcache_tier::{CacheEngine, Entry, Error, Store, StoreError};
use tick::{Clock, Stopwatch};

use crate::builder::CachedStoreBuilder;
use crate::config::ContentionPolicy;
use crate::epoch::WriteEpochs;
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};

pub(crate) struct CacheInner<S, E> {
    pub(crate) store: S,
    pub(crate) engine: E,
    pub(crate) clock: Clock,
    pub(crate) spawner: Spawner,
    pub(crate) found_ttl: Duration,
    pub(crate) negative_ttl: Duration,
    pub(crate) contention: ContentionPolicy,
    pub(crate) telemetry: CacheTelemetry,
    pub(crate) epochs: WriteEpochs,
}

/// A [`Store`] that answers lookups from a [`CacheEngine`] and keeps it warm on writes.
///
/// # Lookups
///
/// [`get`](Store::get) first asks the engine. A cached entry, URL or error, is returned
/// as is. On a miss the caller asks the engine for the key's recompute permission:
///
/// - The caller that gets it reads the store, caches the outcome (successes for the
///   found TTL, failures for the negative TTL), releases the permission and returns the
///   outcome. This runs as a task on the [`Spawner`], so the cache is populated and the
///   permission released even if the caller gives up waiting, or the store panics.
/// - Every other caller follows the [`ContentionPolicy`]. With the default,
///   [`ContentionPolicy::Reject`], it gets [`StoreError::NotFound`] at once: under a
///   stampede on a cold key, only one request reaches the store and the rest fail fast.
///
/// # Writes
///
/// `create` and `update` go to the store first. Only when the store accepted the write is
/// the URL cached, for as long as the record lives; a record that is already expired is
/// not cached. `delete` removes the record, then the cached entry.
///
/// A recompute that overlaps an accepted write does not cache what it read: the write
/// may have made it stale.
///
/// # Failures
///
/// Store errors are returned unchanged. Engine errors are logged and otherwise ignored:
/// a broken engine turns lookups into direct store reads, it never fails a request.
///
/// Clones share the same store, engine, and settings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache::{CachedStore, MemoryStore};
/// use linkcache_tier::Store;
/// use tick::Clock;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), linkcache_tier::StoreError> {
/// let clock = Clock::new_tokio();
/// let cache = CachedStore::builder(MemoryStore::new(clock.clone()), clock.clone())
///     .memory()
///     .name("links")
///     .build();
///
/// let expires_at = clock.system_time() + Duration::from_secs(3600);
/// cache.create("abc123", "https://example.com", expires_at).await?;
///
/// // Served from the cache.
/// assert_eq!(cache.get("abc123").await?, "https://example.com");
/// # Ok(())
/// # }
/// ```
pub struct CachedStore<S, E> {
    inner: Arc<CacheInner<S, E>>,
}

impl<S, E> Clone for CachedStore<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, E> std::fmt::Debug for CachedStore<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStore")
            .field("name", &self.inner.telemetry.name())
            .field("found_ttl", &self.inner.found_ttl)
            .field("negative_ttl", &self.inner.negative_ttl)
            .field("contention", &self.inner.contention)
            .finish_non_exhaustive()
    }
}

impl<S> CachedStore<S, ()> {
    /// Creates a builder for a cache in front of `store`.
    ///
    /// Pick an engine with [`engine`](CachedStoreBuilder::engine) or
    /// [`memory`](CachedStoreBuilder::memory) before building.
    #[must_use]
    pub fn builder(store: S, clock: Clock) -> CachedStoreBuilder<S> {
        CachedStoreBuilder::new(store, clock)
    }
}

impl<S, E> CachedStore<S, E> {
    pub(crate) fn from_inner(inner: CacheInner<S, E>) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// Returns the cache name used in log records.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.telemetry.name()
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }
}

impl<S, E> CacheInner<S, E>
where
    S: Store,
    E: CacheEngine,
{
    fn answer(&self, key: &str, entry: Entry, watch: &Stopwatch) -> Result<String, StoreError> {
        let activity = if entry.is_negative() {
            CacheActivity::NegativeHit
        } else {
            CacheActivity::Hit
        };
        self.telemetry.record(key, CacheOperation::Get, activity, Some(watch.elapsed()));
        entry.into_result()
    }

    async fn lookup(&self, key: &str, operation: CacheOperation) -> Option<Entry> {
        match self.engine.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                self.engine_failed(key, operation, &error);
                None
            }
        }
    }

    /// Reads the store and caches the outcome. Runs while holding the key's permission.
    async fn recompute(&self, key: &str) -> Result<String, StoreError> {
        let watch = self.clock.stopwatch();

        // Someone may have finished a recompute between our miss and our grant.
        if let Some(entry) = self.lookup(key, CacheOperation::Get).await {
            self.release(key).await;
            return self.answer(key, entry, &watch);
        }

        let epoch = self.epochs.current(key);
        let result = match AssertUnwindSafe(self.store.get(key)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                self.release(key).await;
                std::panic::resume_unwind(panic);
            }
        };

        if self.epochs.current(key) == epoch {
            let ttl = if result.is_ok() { self.found_ttl } else { self.negative_ttl };
            match self.engine.set(key, Entry::from(result.clone()), ttl).await {
                // A write accepted while the entry was being stored may already have
                // evicted or repopulated the key; ours must not outlive it.
                Ok(()) if self.epochs.current(key) != epoch => self.evict_stale(key).await,
                Ok(()) => {}
                Err(error) => self.engine_failed(key, CacheOperation::Get, &error),
            }
        } else {
            self.telemetry.record(key, CacheOperation::Get, CacheActivity::Skipped, None);
        }
        self.release(key).await;

        self.telemetry
            .record(key, CacheOperation::Get, CacheActivity::Recomputed, Some(watch.elapsed()));
        result
    }

    async fn evict_stale(&self, key: &str) {
        match self.engine.delete(key).await {
            Ok(()) => self.telemetry.record(key, CacheOperation::Get, CacheActivity::Invalidated, None),
            Err(error) => self.engine_failed(key, CacheOperation::Get, &error),
        }
    }

    async fn release(&self, key: &str) {
        if let Err(error) = self.engine.release(key).await {
            self.engine_failed(key, CacheOperation::Get, &error);
        }
    }

    async fn contended(&self, key: &str, watch: &Stopwatch) -> Result<String, StoreError> {
        self.telemetry
            .record(key, CacheOperation::Get, CacheActivity::Contended, Some(watch.elapsed()));

        if let ContentionPolicy::Retry { attempts, backoff_ms } = self.contention {
            let backoff = Duration::from_millis(backoff_ms);
            for _ in 0..attempts {
                self.clock.delay(backoff).await;
                if let Some(entry) = self.lookup(key, CacheOperation::Get).await {
                    return self.answer(key, entry, watch);
                }
            }
        }

        Err(StoreError::NotFound)
    }

    /// Reads the store without touching the cache.
    async fn read_through(&self, key: &str, watch: &Stopwatch) -> Result<String, StoreError> {
        let result = self.store.get(key).await;
        if result.is_err() {
            self.telemetry
                .record(key, CacheOperation::Get, CacheActivity::StoreError, Some(watch.elapsed()));
        }
        result
    }

    /// Caches `url` for the remaining lifetime of a record the store just accepted.
    async fn populate(&self, key: &str, url: &str, expires_at: SystemTime, operation: CacheOperation, watch: &Stopwatch) {
        let remaining = expires_at
            .duration_since(self.clock.system_time())
            .unwrap_or(Duration::ZERO);

        if remaining.is_zero() {
            // Nothing to cache, but an older entry for the key must not outlive the write.
            if let Err(error) = self.engine.delete(key).await {
                self.engine_failed(key, operation, &error);
            }
            self.telemetry.record(key, operation, CacheActivity::Skipped, Some(watch.elapsed()));
            return;
        }

        match self.engine.set(key, Entry::found(url), remaining).await {
            Ok(()) => self.telemetry.record(key, operation, CacheActivity::Populated, Some(watch.elapsed())),
            Err(error) => self.engine_failed(key, operation, &error),
        }
    }

    fn store_failed(&self, key: &str, operation: CacheOperation, watch: &Stopwatch) {
        self.telemetry
            .record(key, operation, CacheActivity::StoreError, Some(watch.elapsed()));
    }

    fn engine_failed(&self, key: &str, operation: CacheOperation, error: &Error) {
        self.telemetry.record_engine_error(key, operation, error);
    }
}

impl<S, E> Store for CachedStore<S, E>
where
    S: Store + 'static,
    E: CacheEngine + 'static,
{
    async fn create(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        let watch = self.inner.clock.stopwatch();

        if let Err(error) = self.inner.store.create(id, url, expires_at).await {
            self.inner.store_failed(id, CacheOperation::Create, &watch);
            return Err(error);
        }
        self.inner.epochs.bump(id);

        self.inner
            .populate(id, url, expires_at, CacheOperation::Create, &watch)
            .await;
        Ok(())
    }

    async fn update(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        let watch = self.inner.clock.stopwatch();

        if let Err(error) = self.inner.store.update(id, url, expires_at).await {
            self.inner.store_failed(id, CacheOperation::Update, &watch);
            return Err(error);
        }
        self.inner.epochs.bump(id);

        self.inner
            .populate(id, url, expires_at, CacheOperation::Update, &watch)
            .await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let watch = self.inner.clock.stopwatch();

        if let Err(error) = self.inner.store.delete(id).await {
            self.inner.store_failed(id, CacheOperation::Delete, &watch);
            return Err(error);
        }
        self.inner.epochs.bump(id);

        match self.inner.engine.delete(id).await {
            Ok(()) => self
                .inner
                .telemetry
                .record(id, CacheOperation::Delete, CacheActivity::Invalidated, Some(watch.elapsed())),
            Err(error) => self.inner.engine_failed(id, CacheOperation::Delete, &error),
        }
        Ok(())
    }

    /// Returns the URL for `id`, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns the store's error, fresh or cached. Returns [`StoreError::NotFound`] when
    /// another caller is already recomputing `id` and the [`ContentionPolicy`] gives up,
    /// even if the record exists.
    async fn get(&self, id: &str) -> Result<String, StoreError> {
        let inner = &self.inner;
        let watch = inner.clock.stopwatch();

        if let Some(entry) = inner.lookup(id, CacheOperation::Get).await {
            return inner.answer(id, entry, &watch);
        }
        inner
            .telemetry
            .record(id, CacheOperation::Get, CacheActivity::Miss, Some(watch.elapsed()));

        match inner.engine.acquire(id).await {
            Ok(true) => {
                let task_inner = Arc::clone(inner);
                let key = id.to_owned();
                inner
                    .spawner
                    .spawn(async move { task_inner.recompute(&key).await })
                    .await
            }
            Ok(false) => inner.contended(id, &watch).await,
            Err(error) => {
                inner.engine_failed(id, CacheOperation::Get, &error);
                inner.read_through(id, &watch).await
            }
        }
    }

    async fn list_reclaimable(&self, limit: Option<NonZeroUsize>) -> Result<Vec<String>, StoreError> {
        let watch = self.inner.clock.stopwatch();
        let result = self.inner.store.list_reclaimable(limit).await;

        let activity = if result.is_ok() {
            CacheActivity::Ok
        } else {
            CacheActivity::StoreError
        };
        self.inner
            .telemetry
            .record("", CacheOperation::ListReclaimable, activity, Some(watch.elapsed()));
        result
    }
}
