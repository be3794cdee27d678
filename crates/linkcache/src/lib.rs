// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A stampede-protected cache in front of a short-link store.
//!
//! [`CachedStore`] decorates any [`Store`] with a [`CacheEngine`]:
//!
//! - Lookups are answered from the engine when possible. Failed lookups are cached too,
//!   for a shorter time, so a hot identifier that does not exist stays off the store.
//! - On a miss exactly one caller per key recomputes the entry; the others are turned
//!   away according to the [`ContentionPolicy`] instead of piling onto the store.
//! - Writes go to the store first and then warm the cache.
//! - Engine failures are logged and never fail a request.
//!
//! Engines ship in separate crates: a process-local one ([`InMemoryEngine`]) and, with the
//! `redis` feature, one shared through Redis. [`Engine`] picks between them from
//! [`CacheConfig`].
//!
//! Identifiers are issued by [`IdPool`], which recycles reclaimed identifiers before minting
//! new ones. A [`CachedStore`] is itself a [`Store`], so a pool can sit on top of the cache.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use anyspawn::Spawner;
//! use linkcache::{CachedStore, IdPool, MemoryStore};
//! use linkcache_tier::Store;
//! use tick::Clock;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), linkcache_tier::StoreError> {
//! let clock = Clock::new_tokio();
//! let cache = CachedStore::builder(MemoryStore::new(clock.clone()), clock.clone())
//!     .memory()
//!     .build();
//! let pool = IdPool::new(cache.clone(), Spawner::new_tokio(), clock.clone());
//!
//! let expires_at = clock.system_time() + Duration::from_secs(24 * 60 * 60);
//! let id = pool.get("https://example.com/a/long/path", expires_at).await?;
//!
//! assert_eq!(cache.get(&id).await?, "https://example.com/a/long/path");
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Every operation emits one `tracing` event named `cache.event` with the fields
//! `cache.name`, `cache.key`, `cache.operation`, `cache.activity` and `cache.duration_ns`.
//! Hits and misses are logged at `debug`, recomputes and writes at `info`, contention and
//! store failures at `warn`, engine failures at `error`.
//!
//! # Features
//!
//! - `redis`: enables `Engine::Redis` and the `redis` engine configuration.
//! - `test-util`: enables `linkcache_tier::testing` and the `tick` test clocks.

mod builder;
mod cache;
mod config;
mod engine;
mod epoch;
mod memory_store;
mod telemetry;

#[doc(inline)]
pub use builder::CachedStoreBuilder;
#[doc(inline)]
pub use cache::CachedStore;
#[doc(inline)]
pub use config::{CacheConfig, ContentionPolicy, EngineConfig};
#[doc(inline)]
pub use engine::Engine;
#[doc(inline)]
pub use linkcache_ids::{IdPool, IdStack, InvalidId, PoolConfig, ReclaimOutcome, validate};
#[doc(inline)]
pub use linkcache_memory::{InMemoryEngine, PermissionTable};
#[cfg(feature = "redis")]
#[doc(inline)]
pub use linkcache_redis::{RedisConfig, RedisEngine};
#[doc(inline)]
pub use linkcache_tier::{CacheEngine, Entry, Error, PermissionGate, Store, StoreError};
#[doc(inline)]
pub use memory_store::MemoryStore;
