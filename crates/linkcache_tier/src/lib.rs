// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Contracts shared by the linkcache crates.
//!
//! This crate defines the two narrow seams the caching layer talks through:
//!
//! - [`Store`]: the persistent key→URL store (create, update, delete, get, list reclaimable),
//!   failing with [`StoreError`].
//! - [`CacheEngine`]: a key→[`Entry`] map with per-entry expiration that is also a
//!   [`PermissionGate`], failing with [`Error`].
//!
//! An [`Entry`] caches either the URL or the [`StoreError`] a lookup produced, so negative
//! results are served from cache as well.
//!
//! # Implementing a Cache Engine
//!
//! ```
//! use std::collections::{HashMap, HashSet};
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use linkcache_tier::{CacheEngine, Entry, Error, PermissionGate};
//!
//! #[derive(Default)]
//! struct Naive {
//!     entries: Mutex<HashMap<String, Entry>>,
//!     held: Mutex<HashSet<String>>,
//! }
//!
//! impl PermissionGate for Naive {
//!     async fn acquire(&self, key: &str) -> Result<bool, Error> {
//!         Ok(self.held.lock().unwrap().insert(key.to_owned()))
//!     }
//!
//!     async fn release(&self, key: &str) -> Result<(), Error> {
//!         self.held.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//! }
//!
//! impl CacheEngine for Naive {
//!     async fn get(&self, key: &str) -> Result<Option<Entry>, Error> {
//!         Ok(self.entries.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &str, entry: Entry, _ttl: Duration) -> Result<(), Error> {
//!         self.entries.lock().unwrap().insert(key.to_owned(), entry);
//!         Ok(())
//!     }
//!
//!     async fn delete(&self, key: &str) -> Result<(), Error> {
//!         self.entries.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Testing
//!
//! Enable the `test-util` feature for the [`testing`] module, which provides recording,
//! failure-injecting doubles for both contracts.

mod engine;
mod entry;
pub mod error;
mod store;
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

#[doc(inline)]
pub use engine::{CacheEngine, PermissionGate};
#[doc(inline)]
pub use entry::Entry;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use store::{NOT_FOUND_MESSAGE, Store, StoreError};
