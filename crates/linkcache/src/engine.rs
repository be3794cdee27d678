// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime selection between the local and the Redis engine.

use std::time::Duration;

use anyspawn::Spawner;
use linkcache_memory::InMemoryEngine;
#[cfg(feature = "redis")]
use linkcache_redis::RedisEngine;
use linkcache_tier::{CacheEngine, Entry, Error, PermissionGate};
use tick::Clock;

use crate::config::{CacheConfig, EngineConfig};

/// One of the built-in engines, chosen from [`EngineConfig`].
///
/// Use this when the engine is picked by configuration rather than at compile time.
/// Each method forwards to the wrapped engine.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Engine {
    /// Process-local engine.
    Memory(InMemoryEngine),
    /// Engine shared through Redis.
    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    Redis(RedisEngine),
}

impl Engine {
    /// Builds the engine described by `config.engine`.
    ///
    /// A local engine gets `config.max_capacity`, a permission lease of `config.lease_ttl()`
    /// and, unless sweeping is disabled, a sweeper spawned on `spawner`. The sweeper stops
    /// once the engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the Redis server cannot be reached.
    pub async fn from_config(config: &CacheConfig, clock: Clock, spawner: &Spawner) -> Result<Self, Error> {
        match &config.engine {
            EngineConfig::Memory => Ok(Self::Memory(memory_engine(config, clock, spawner))),
            #[cfg(feature = "redis")]
            EngineConfig::Redis(redis) => RedisEngine::connect(redis, clock).await.map(Self::Redis),
        }
    }
}

pub(crate) fn memory_engine(config: &CacheConfig, clock: Clock, spawner: &Spawner) -> InMemoryEngine {
    let mut builder = InMemoryEngine::builder(clock).lease_ttl(config.lease_ttl());
    if let Some(capacity) = config.max_capacity {
        builder = builder.max_capacity(capacity);
    }

    let engine = builder.build();
    if let Some(interval) = config.sweep_interval() {
        // Detached; exits on its own after the engine is dropped.
        drop(engine.spawn_sweeper(spawner, interval));
    }
    engine
}

impl From<InMemoryEngine> for Engine {
    fn from(engine: InMemoryEngine) -> Self {
        Self::Memory(engine)
    }
}

#[cfg(feature = "redis")]
impl From<RedisEngine> for Engine {
    fn from(engine: RedisEngine) -> Self {
        Self::Redis(engine)
    }
}

impl PermissionGate for Engine {
    async fn acquire(&self, key: &str) -> Result<bool, Error> {
        match self {
            Self::Memory(engine) => engine.acquire(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(engine) => engine.acquire(key).await,
        }
    }

    async fn release(&self, key: &str) -> Result<(), Error> {
        match self {
            Self::Memory(engine) => engine.release(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(engine) => engine.release(key).await,
        }
    }
}

impl CacheEngine for Engine {
    async fn get(&self, key: &str) -> Result<Option<Entry>, Error> {
        match self {
            Self::Memory(engine) => engine.get(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(engine) => engine.get(key).await,
        }
    }

    async fn set(&self, key: &str, entry: Entry, ttl: Duration) -> Result<(), Error> {
        match self {
            Self::Memory(engine) => engine.set(key, entry, ttl).await,
            #[cfg(feature = "redis")]
            Self::Redis(engine) => engine.set(key, entry, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        match self {
            Self::Memory(engine) => engine.delete(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(engine) => engine.delete(key).await,
        }
    }
}
