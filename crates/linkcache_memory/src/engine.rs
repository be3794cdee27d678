// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache engine backed by moka.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};

use anyspawn::{JoinHandle, Spawner};
use linkcache_tier::{CacheEngine, Entry, Error, PermissionGate};
use moka::future::Cache;
use tick::Clock;

use crate::builder::InMemoryEngineBuilder;
use crate::permission::PermissionTable;

#[derive(Debug, Clone)]
struct Stored {
    entry: Entry,
    ttl: Duration,
    // `None` when `now + ttl` does not fit in a `SystemTime`.
    expires_at: Option<SystemTime>,
}

impl Stored {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

struct PerEntryTtl;

impl moka::Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Stored, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Debug)]
struct EngineInner {
    cache: Cache<String, Stored>,
    permissions: PermissionTable,
    clock: Clock,
}

/// A process-local cache engine.
///
/// Entries live in a moka cache with a per-entry expiry policy, so they are evicted
/// physically once their TTL passes. Reads also compare the entry deadline against the
/// injected [`Clock`], which makes an expired entry invisible immediately, even before
/// moka's maintenance has run.
///
/// Recompute permissions come from a [`PermissionTable`].
///
/// Clones share the same storage and permission table.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache_memory::InMemoryEngine;
/// use linkcache_tier::{CacheEngine, Entry};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let engine = InMemoryEngine::new(Clock::new_frozen());
///
/// engine.set("abc123", Entry::found("https://example.com"), Duration::from_secs(60)).await?;
/// let entry = engine.get("abc123").await?;
/// assert_eq!(entry.and_then(|e| e.url().map(str::to_owned)).as_deref(), Some("https://example.com"));
/// # Ok::<(), linkcache_tier::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryEngine {
    inner: Arc<EngineInner>,
}

impl InMemoryEngine {
    /// Creates an unbounded engine whose permissions never lapse.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a builder for configuring an engine.
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryEngineBuilder {
        InMemoryEngineBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: InMemoryEngineBuilder) -> Self {
        let mut moka_builder = Cache::builder().expire_after(PerEntryTtl);

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        let permissions = match builder.lease_ttl {
            Some(ttl) => PermissionTable::with_lease(ttl, builder.clock.clone()),
            None => PermissionTable::new(),
        };

        Self {
            inner: Arc::new(EngineInner {
                cache: moka_builder.build(),
                permissions,
                clock: builder.clock,
            }),
        }
    }

    /// Returns the permission table used for recompute permissions.
    #[must_use]
    pub fn permissions(&self) -> &PermissionTable {
        &self.inner.permissions
    }

    /// Returns the approximate number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.cache.entry_count()
    }

    /// Runs pending evictions and drops lapsed permission leases.
    pub async fn sweep(&self) {
        sweep(&self.inner).await;
    }

    /// Starts a background task that sweeps the engine every `interval`.
    ///
    /// The task only keeps a weak reference and finishes on the first tick after the last
    /// clone of the engine has been dropped.
    pub fn spawn_sweeper(&self, spawner: &Spawner, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let clock = self.inner.clock.clone();

        spawner.spawn(run_sweeper(weak, clock, interval))
    }
}

async fn sweep(inner: &EngineInner) {
    inner.cache.run_pending_tasks().await;
    let purged = inner.permissions.purge_expired();
    if purged > 0 {
        tracing::debug!(purged, "dropped lapsed cache permissions");
    }
}

async fn run_sweeper(weak: Weak<EngineInner>, clock: Clock, interval: Duration) {
    loop {
        clock.delay(interval).await;

        let Some(inner) = weak.upgrade() else {
            tracing::debug!("cache engine dropped, sweeper exiting");
            break;
        };

        sweep(&inner).await;
    }
}

impl PermissionGate for InMemoryEngine {
    async fn acquire(&self, key: &str) -> Result<bool, Error> {
        Ok(self.inner.permissions.try_acquire(key))
    }

    async fn release(&self, key: &str) -> Result<(), Error> {
        self.inner.permissions.release_key(key);
        Ok(())
    }
}

impl CacheEngine for InMemoryEngine {
    async fn get(&self, key: &str) -> Result<Option<Entry>, Error> {
        let Some(stored) = self.inner.cache.get(key).await else {
            return Ok(None);
        };

        if stored.is_live(self.inner.clock.system_time()) {
            Ok(Some(stored.entry))
        } else {
            self.inner.cache.invalidate(key).await;
            Ok(None)
        }
    }

    async fn set(&self, key: &str, entry: Entry, ttl: Duration) -> Result<(), Error> {
        if ttl.is_zero() {
            self.inner.cache.invalidate(key).await;
            return Ok(());
        }

        let stored = Stored {
            entry,
            ttl,
            expires_at: self.inner.clock.system_time().checked_add(ttl),
        };
        self.inner.cache.insert(key.to_owned(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.inner.cache.invalidate(key).await;
        Ok(())
    }
}
