// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`CachedStore`].

use std::time::Duration;

use anyspawn::Spawner;
use linkcache_memory::InMemoryEngine;
use linkcache_tier::CacheEngine;
use tick::Clock;

use crate::cache::{CacheInner, CachedStore};
use crate::config::{CacheConfig, ContentionPolicy};
use crate::epoch::WriteEpochs;
use crate::telemetry::{CacheTelemetry, DEFAULT_CACHE_NAME};

/// Builder for a [`CachedStore`].
///
/// Created by [`CachedStore::builder`]. The engine type parameter starts out as `()`;
/// [`engine`](Self::engine) or [`memory`](Self::memory) fill it in, and only then can the
/// cache be built.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache::{CachedStore, ContentionPolicy, MemoryStore};
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let cache = CachedStore::builder(MemoryStore::new(clock.clone()), clock)
///     .found_ttl(Duration::from_secs(3600))
///     .negative_ttl(Duration::from_secs(60))
///     .contention(ContentionPolicy::retry(3, Duration::from_millis(25)))
///     .max_capacity(10_000)
///     .memory()
///     .name("links")
///     .build();
///
/// assert_eq!(cache.name(), "links");
/// ```
#[derive(Debug)]
pub struct CachedStoreBuilder<S, E = ()> {
    store: S,
    engine: E,
    clock: Clock,
    spawner: Option<Spawner>,
    name: &'static str,
    logs: bool,
    found_ttl: Duration,
    negative_ttl: Duration,
    lease_ttl: Duration,
    contention: ContentionPolicy,
    max_capacity: Option<u64>,
}

impl<S> CachedStoreBuilder<S, ()> {
    pub(crate) fn new(store: S, clock: Clock) -> Self {
        let defaults = CacheConfig::default();
        Self {
            store,
            engine: (),
            clock,
            spawner: None,
            name: DEFAULT_CACHE_NAME,
            logs: true,
            found_ttl: defaults.found_ttl(),
            negative_ttl: defaults.negative_ttl(),
            lease_ttl: defaults.lease_ttl(),
            contention: defaults.contention,
            max_capacity: defaults.max_capacity,
        }
    }

    /// Uses the local engine, sized and leased from the settings given so far.
    ///
    /// Call [`max_capacity`](Self::max_capacity) and [`lease_ttl`](Self::lease_ttl) before
    /// this method for them to take effect. No sweeper is started; use
    /// [`InMemoryEngine::spawn_sweeper`] on [`CachedStore::engine`] or build the engine with
    /// [`Engine::from_config`](crate::Engine::from_config) for that.
    #[must_use]
    pub fn memory(self) -> CachedStoreBuilder<S, InMemoryEngine> {
        let mut builder = InMemoryEngine::builder(self.clock.clone())
            .lease_ttl(self.lease_ttl)
            .name(self.name);
        if let Some(capacity) = self.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        let engine = builder.build();
        self.engine(engine)
    }
}

impl<S, E> CachedStoreBuilder<S, E> {
    /// Uses `engine` as the cache engine.
    #[must_use]
    pub fn engine<E2>(self, engine: E2) -> CachedStoreBuilder<S, E2>
    where
        E2: CacheEngine,
    {
        CachedStoreBuilder {
            store: self.store,
            engine,
            clock: self.clock,
            spawner: self.spawner,
            name: self.name,
            logs: self.logs,
            found_ttl: self.found_ttl,
            negative_ttl: self.negative_ttl,
            lease_ttl: self.lease_ttl,
            contention: self.contention,
            max_capacity: self.max_capacity,
        }
    }

    /// Sets the name reported in log records. Defaults to `linkcache`.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Turns `cache.event` log records on or off. On by default.
    ///
    /// Engine failures are still logged when this is off.
    #[must_use]
    pub fn logs(mut self, enabled: bool) -> Self {
        self.logs = enabled;
        self
    }

    /// Sets the spawner that runs recomputes. Defaults to [`Spawner::new_tokio`].
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Sets how long successful lookups stay cached. Defaults to 24 hours.
    #[must_use]
    pub fn found_ttl(mut self, ttl: Duration) -> Self {
        self.found_ttl = ttl;
        self
    }

    /// Sets how long failed lookups stay cached. Defaults to 1 hour.
    #[must_use]
    pub fn negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = ttl;
        self
    }

    /// Sets the behavior of callers that lose the recompute race.
    #[must_use]
    pub fn contention(mut self, policy: ContentionPolicy) -> Self {
        self.contention = policy;
        self
    }

    /// Sets the local engine's capacity. Only used by [`memory`](CachedStoreBuilder::memory).
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the local engine's permission lease. Only used by
    /// [`memory`](CachedStoreBuilder::memory). Defaults to 30 seconds.
    #[must_use]
    pub fn lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Applies every setting from `config`.
    ///
    /// `config.engine` is not used here; pass the result of
    /// [`Engine::from_config`](crate::Engine::from_config) to [`engine`](Self::engine).
    #[must_use]
    pub fn config(mut self, config: &CacheConfig) -> Self {
        self.found_ttl = config.found_ttl();
        self.negative_ttl = config.negative_ttl();
        self.lease_ttl = config.lease_ttl();
        self.contention = config.contention;
        self.max_capacity = config.max_capacity;
        self
    }
}

impl<S, E> CachedStoreBuilder<S, E>
where
    E: CacheEngine,
{
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> CachedStore<S, E> {
        CachedStore::from_inner(CacheInner {
            store: self.store,
            engine: self.engine,
            found_ttl: self.found_ttl,
            negative_ttl: self.negative_ttl,
            contention: self.contention,
            clock: self.clock,
            spawner: self.spawner.unwrap_or_else(Spawner::new_tokio),
            telemetry: CacheTelemetry::new(self.name, self.logs),
            epochs: WriteEpochs::new(),
        })
    }
}
