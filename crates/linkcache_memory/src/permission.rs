// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Process-local permission gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use linkcache_tier::{Error, PermissionGate};
use parking_lot::RwLock;
use tick::Clock;

#[derive(Debug, Clone)]
struct Lease {
    ttl: Duration,
    clock: Clock,
}

/// A concurrency-safe set-if-absent lock table keyed by string.
///
/// Exactly one of any number of concurrent [`try_acquire`](Self::try_acquire) calls for a key
/// wins until the key is released. Lookups first take the shared lock, so contended keys are
/// rejected without serializing on the exclusive lock; the final decision is always made
/// under the exclusive lock.
///
/// A table created with [`with_lease`](Self::with_lease) also treats a permission older than
/// the lease TTL as abandoned, which lets a crashed or hung holder be replaced.
///
/// Clones share the same table.
///
/// # Examples
///
/// ```
/// use linkcache_memory::PermissionTable;
///
/// let table = PermissionTable::new();
/// assert!(table.try_acquire("k"));
/// assert!(!table.try_acquire("k"));
///
/// table.release_key("k");
/// assert!(table.try_acquire("k"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    held: Arc<RwLock<HashMap<String, Option<Instant>>>>,
    lease: Option<Lease>,
}

impl PermissionTable {
    /// Creates a table whose permissions are held until released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table whose permissions lapse `ttl` after being granted.
    #[must_use]
    pub fn with_lease(ttl: Duration, clock: Clock) -> Self {
        Self {
            held: Arc::default(),
            lease: Some(Lease { ttl, clock }),
        }
    }

    /// Tries to take the permission for `key`.
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = self.now();

        if self.held.read().get(key).is_some_and(|granted| self.is_live(*granted, now)) {
            return false;
        }

        let mut held = self.held.write();
        if held.get(key).is_some_and(|granted| self.is_live(*granted, now)) {
            return false;
        }

        held.insert(key.to_owned(), now);
        true
    }

    /// Releases the permission for `key`. Releasing a free key does nothing.
    pub fn release_key(&self, key: &str) {
        self.held.write().remove(key);
    }

    /// Returns `true` if someone currently holds the permission for `key`.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        let now = self.now();
        self.held.read().get(key).is_some_and(|granted| self.is_live(*granted, now))
    }

    /// Returns the number of recorded permissions, including lapsed leases not yet purged.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.read().len()
    }

    /// Drops every lapsed lease and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.lease.is_none() {
            return 0;
        }

        let now = self.now();
        let mut held = self.held.write();
        let before = held.len();
        held.retain(|_, granted| self.is_live(*granted, now));
        before - held.len()
    }

    fn now(&self) -> Option<Instant> {
        self.lease.as_ref().map(|lease| lease.clock.instant())
    }

    fn is_live(&self, granted: Option<Instant>, now: Option<Instant>) -> bool {
        match (&self.lease, granted, now) {
            (Some(lease), Some(granted), Some(now)) => now.saturating_duration_since(granted) < lease.ttl,
            _ => true,
        }
    }
}

impl PermissionGate for PermissionTable {
    async fn acquire(&self, key: &str) -> Result<bool, Error> {
        Ok(self.try_acquire(key))
    }

    async fn release(&self, key: &str) -> Result<(), Error> {
        self.release_key(key);
        Ok(())
    }
}
