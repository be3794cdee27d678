// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for the store and engine contracts.
//!
//! [`MockEngine`] and [`RecordingStore`] keep their state in memory, record every call
//! they receive, and support failure injection so error paths can be exercised without
//! real infrastructure.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tick::Clock;

use crate::{CacheEngine, Entry, Error, PermissionGate, Store, StoreError};

/// Recorded cache engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    /// A get for the given key.
    Get(String),
    /// A set of an entry with its TTL.
    Set {
        /// The key that was written.
        key: String,
        /// The entry that was written.
        entry: Entry,
        /// The requested time to live.
        ttl: Duration,
    },
    /// A delete for the given key.
    Delete(String),
    /// A permission acquisition attempt for the given key.
    Acquire(String),
    /// A permission release for the given key.
    Release(String),
}

type EnginePredicate = Box<dyn Fn(&EngineOp) -> bool + Send + Sync>;

/// A configurable in-memory cache engine for tests.
///
/// Entries never expire; the TTL passed to `set` is only recorded. Permissions behave like
/// a local lock table without leases.
///
/// # Examples
///
/// ```
/// use linkcache_tier::testing::{EngineOp, MockEngine};
/// use linkcache_tier::{CacheEngine, Entry};
///
/// # async fn example() {
/// let engine = MockEngine::new();
/// engine.fail_when(|op| matches!(op, EngineOp::Get(k) if k == "broken"));
///
/// assert!(engine.get("broken").await.is_err());
/// assert!(engine.get("fine").await.unwrap().is_none());
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockEngine {
    data: Arc<Mutex<HashMap<String, Entry>>>,
    held: Arc<Mutex<HashSet<String>>>,
    operations: Arc<Mutex<Vec<EngineOp>>>,
    fail_when: Arc<Mutex<Option<EnginePredicate>>>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("data", &self.data)
            .field("held", &self.held)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl MockEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a predicate that decides which operations fail with a transport error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&EngineOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns all recorded operations in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<EngineOp> {
        self.operations.lock().clone()
    }

    /// Counts recorded operations matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&EngineOp) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    /// Clears the recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the stored entry for `key` without recording an operation.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<Entry> {
        self.data.lock().get(key).cloned()
    }

    /// Returns `true` if the permission for `key` is currently held.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }

    fn record(&self, op: EngineOp) -> Result<(), Error> {
        let should_fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);

        if should_fail {
            Err(Error::transport("injected engine failure"))
        } else {
            Ok(())
        }
    }
}

impl PermissionGate for MockEngine {
    async fn acquire(&self, key: &str) -> Result<bool, Error> {
        self.record(EngineOp::Acquire(key.to_owned()))?;
        Ok(self.held.lock().insert(key.to_owned()))
    }

    async fn release(&self, key: &str) -> Result<(), Error> {
        self.record(EngineOp::Release(key.to_owned()))?;
        self.held.lock().remove(key);
        Ok(())
    }
}

impl CacheEngine for MockEngine {
    async fn get(&self, key: &str) -> Result<Option<Entry>, Error> {
        self.record(EngineOp::Get(key.to_owned()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, entry: Entry, ttl: Duration) -> Result<(), Error> {
        self.record(EngineOp::Set {
            key: key.to_owned(),
            entry: entry.clone(),
            ttl,
        })?;
        self.data.lock().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.record(EngineOp::Delete(key.to_owned()))?;
        self.data.lock().remove(key);
        Ok(())
    }
}

/// Recorded store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A create of `id` pointing at `url`.
    Create {
        /// The identifier.
        id: String,
        /// The target URL.
        url: String,
    },
    /// An update of `id` to point at `url`.
    Update {
        /// The identifier.
        id: String,
        /// The target URL.
        url: String,
    },
    /// A delete of the identifier.
    Delete(String),
    /// A lookup of the identifier.
    Get(String),
    /// A reclaimable listing with the given limit.
    ListReclaimable(Option<NonZeroUsize>),
}

type StorePredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A configurable in-memory store for tests.
///
/// `update` accepts any identifier, including ones that were never created, so identifiers
/// handed out by [`RecordingStore::set_reclaimable`] can be re-pointed without seeding rows.
/// Expiration times are stored but never enforced.
#[derive(Clone, Default)]
pub struct RecordingStore {
    rows: Arc<Mutex<HashMap<String, (String, SystemTime)>>>,
    reclaimable: Arc<Mutex<Vec<String>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<StorePredicate>>>,
    panic_when: Arc<Mutex<Option<StorePredicate>>>,
    latency: Arc<Mutex<Option<(Clock, Duration)>>>,
    read_delay: Arc<Mutex<Option<(Clock, Duration)>>>,
}

impl std::fmt::Debug for RecordingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStore")
            .field("rows", &self.rows)
            .field("reclaimable", &self.reclaimable)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl RecordingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly, without recording an operation.
    pub fn insert(&self, id: impl Into<String>, url: impl Into<String>) {
        self.rows.lock().insert(id.into(), (url.into(), SystemTime::UNIX_EPOCH));
    }

    /// Sets the identifiers returned by `list_reclaimable`.
    pub fn set_reclaimable<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        *self.reclaimable.lock() = ids.into_iter().map(Into::into).collect();
    }

    /// Makes every operation wait `latency` on `clock` after it is recorded.
    pub fn set_latency(&self, clock: Clock, latency: Duration) {
        *self.latency.lock() = Some((clock, latency));
    }

    /// Makes `get` read its row, then wait `delay` on `clock` before returning it.
    ///
    /// Writes that land during the wait are not reflected in the answer.
    pub fn delay_reads(&self, clock: Clock, delay: Duration) {
        *self.read_delay.lock() = Some((clock, delay));
    }

    /// Sets a predicate that decides which operations fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Sets a predicate that decides which operations panic.
    pub fn panic_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.panic_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure and panic predicates.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
        *self.panic_when.lock() = None;
    }

    /// Returns all recorded operations in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Counts recorded operations matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&StoreOp) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    /// Counts recorded `get` calls.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.count(|op| matches!(op, StoreOp::Get(_)))
    }

    /// Clears the recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the URL currently stored for `id`.
    #[must_use]
    pub fn url(&self, id: &str) -> Option<String> {
        self.rows.lock().get(id).map(|(url, _)| url.clone())
    }

    #[expect(clippy::panic, reason = "panic injection is what this test double is for")]
    async fn record(&self, op: StoreOp) -> Result<(), StoreError> {
        let should_panic = self.panic_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let should_fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);

        let latency = self.latency.lock().clone();
        if let Some((clock, latency)) = latency {
            clock.delay(latency).await;
        }

        if should_panic {
            panic!("injected store panic");
        }

        if should_fail {
            Err(StoreError::failed("injected store failure"))
        } else {
            Ok(())
        }
    }
}

impl Store for RecordingStore {
    async fn create(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        self.record(StoreOp::Create {
            id: id.to_owned(),
            url: url.to_owned(),
        })
        .await?;

        let mut rows = self.rows.lock();
        if rows.contains_key(id) {
            return Err(StoreError::failed(format!("duplicate id {id}")));
        }
        rows.insert(id.to_owned(), (url.to_owned(), expires_at));
        Ok(())
    }

    async fn update(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        self.record(StoreOp::Update {
            id: id.to_owned(),
            url: url.to_owned(),
        })
        .await?;

        self.rows.lock().insert(id.to_owned(), (url.to_owned(), expires_at));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.record(StoreOp::Delete(id.to_owned())).await?;

        self.rows.lock().remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn get(&self, id: &str) -> Result<String, StoreError> {
        self.record(StoreOp::Get(id.to_owned())).await?;

        let row = self.url(id);
        let read_delay = self.read_delay.lock().clone();
        if let Some((clock, delay)) = read_delay {
            clock.delay(delay).await;
        }
        row.ok_or(StoreError::NotFound)
    }

    async fn list_reclaimable(&self, limit: Option<NonZeroUsize>) -> Result<Vec<String>, StoreError> {
        self.record(StoreOp::ListReclaimable(limit)).await?;

        let mut reclaimable = self.reclaimable.lock();
        let take = limit.map_or(reclaimable.len(), |limit| limit.get().min(reclaimable.len()));
        Ok(reclaimable.drain(..take).collect())
    }
}
