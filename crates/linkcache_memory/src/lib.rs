// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Process-local cache engine and permission gate.
//!
//! [`InMemoryEngine`] implements [`linkcache_tier::CacheEngine`] on top of a moka cache with
//! per-entry expiration. Its recompute permissions come from a [`PermissionTable`], which is
//! also usable on its own as a keyed set-if-absent lock table.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use linkcache_memory::InMemoryEngine;
//! use linkcache_tier::{CacheEngine, Entry, PermissionGate};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let engine = InMemoryEngine::builder(Clock::new_frozen())
//!     .max_capacity(1000)
//!     .build();
//!
//! if engine.acquire("abc123").await? {
//!     engine.set("abc123", Entry::found("https://example.com"), Duration::from_secs(60)).await?;
//!     engine.release("abc123").await?;
//! }
//! assert!(engine.get("abc123").await?.is_some());
//! # Ok::<(), linkcache_tier::Error>(())
//! # });
//! ```
//!
//! Call [`InMemoryEngine::spawn_sweeper`] to evict expired entries and lapsed leases
//! periodically instead of waiting for moka's lazy maintenance.

mod builder;
mod engine;
mod permission;

#[doc(inline)]
pub use builder::InMemoryEngineBuilder;
#[doc(inline)]
pub use engine::InMemoryEngine;
#[doc(inline)]
pub use permission::PermissionTable;
