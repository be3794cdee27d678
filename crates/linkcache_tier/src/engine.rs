// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Traits for cache engines and the permission gate they carry.
//!
//! [`CacheEngine`] is the storage side of the caching decorator: a key→[`Entry`] map with
//! per-entry expiration. Every engine is also a [`PermissionGate`], which is how the
//! decorator makes sure only one caller per key recomputes a missing entry.

use std::time::Duration;

use crate::{Entry, Error};

/// A keyed set-if-absent lock table.
///
/// Among any number of concurrent `acquire` calls for the same key, exactly one observes
/// `true` until the holder releases the key. Lease-based implementations additionally
/// treat a permission as abandoned once its lease has expired.
pub trait PermissionGate: Send + Sync {
    /// Tries to take the permission for `key`. Returns `false` if someone else holds it.
    fn acquire(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Gives up the permission for `key`. Releasing a key that is not held is a no-op.
    fn release(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Trait for cache engine implementations.
///
/// An entry is authoritative only inside its TTL window. Engines must report an expired
/// entry as absent even if it has not been physically evicted yet.
pub trait CacheEngine: PermissionGate {
    /// Gets the entry for `key`. `Ok(None)` means the entry is absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Entry>, Error>> + Send;

    /// Stores `entry` under `key`, replacing any previous entry, for `ttl`.
    fn set(&self, key: &str, entry: Entry, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the entry for `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}
