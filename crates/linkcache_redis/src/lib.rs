// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis cache engine for linkcache.
//!
//! [`RedisEngine`] implements [`linkcache_tier::CacheEngine`] for deployments where several
//! processes share one cache. Entries are stored as JSON records (see [`encode_entry`]) and
//! recompute permissions are expiring leases taken by an atomic script, so a holder that
//! dies without releasing cannot block a key for longer than the lease TTL.
//!
//! ```no_run
//! use linkcache_redis::{RedisConfig, RedisEngine};
//! use linkcache_tier::PermissionGate;
//! use tick::Clock;
//!
//! # async fn example() -> Result<(), linkcache_tier::Error> {
//! let config = RedisConfig {
//!     url: "redis://127.0.0.1:6379".to_owned(),
//!     ..RedisConfig::default()
//! };
//! let engine = RedisEngine::connect(&config, Clock::new_tokio()).await?;
//!
//! if engine.acquire("abc123").await? {
//!     // recompute, then
//!     engine.release("abc123").await?;
//! }
//! # Ok(())
//! # }
//! ```

mod codec;
mod config;
mod engine;
mod lease;

#[doc(inline)]
pub use codec::{decode_entry, encode_entry, ttl_seconds};
#[doc(inline)]
pub use config::RedisConfig;
#[doc(inline)]
pub use engine::RedisEngine;
#[doc(inline)]
pub use lease::{LEASE_PREFIX, classify_reply, lease_key};
