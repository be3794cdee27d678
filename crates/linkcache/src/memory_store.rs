// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An in-process [`Store`] with soft deletion and expiring records.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::SystemTime;

use linkcache_tier::{Store, StoreError};
use parking_lot::RwLock;
use tick::Clock;

#[derive(Debug, Clone)]
struct Row {
    url: String,
    expires_at: SystemTime,
    deleted: bool,
}

impl Row {
    fn is_live(&self, now: SystemTime) -> bool {
        !self.deleted && self.expires_at > now
    }
}

/// A [`Store`] kept in memory, with the record lifecycle of a relational link table.
///
/// - A record is *live* while it is not deleted and its expiry lies in the future.
/// - `get` only sees live records.
/// - `delete` marks a live record as deleted; the identifier stays taken.
/// - `update` re-points an existing record, live or not, and revives it.
/// - `create` refuses identifiers that already have a record, deleted or not.
/// - `list_reclaimable` returns identifiers whose record is deleted or expired, in
///   identifier order.
///
/// Useful for tests, demos, and single-process deployments. Clones share the same rows.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache::MemoryStore;
/// use linkcache_tier::{Store, StoreError};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let clock = Clock::new_frozen();
/// let store = MemoryStore::new(clock.clone());
/// let expires_at = clock.system_time() + Duration::from_secs(60);
///
/// store.create("abc123", "https://example.com", expires_at).await?;
/// store.delete("abc123").await?;
///
/// assert_eq!(store.get("abc123").await, Err(StoreError::NotFound));
/// assert_eq!(store.list_reclaimable(None).await?, ["abc123"]);
/// # Ok::<(), StoreError>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    rows: Arc<RwLock<BTreeMap<String, Row>>>,
    clock: Clock,
}

impl MemoryStore {
    /// Creates an empty store that judges expiry by `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            rows: Arc::default(),
            clock,
        }
    }

    /// Returns the number of records, including deleted and expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns `true` if the store has no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Store for MemoryStore {
    async fn create(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if rows.contains_key(id) {
            return Err(StoreError::failed(format!("identifier {id} already exists")));
        }

        rows.insert(
            id.to_owned(),
            Row {
                url: url.to_owned(),
                expires_at,
                deleted: false,
            },
        );
        Ok(())
    }

    async fn update(&self, id: &str, url: &str, expires_at: SystemTime) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        let row = rows.get_mut(id).ok_or(StoreError::NotFound)?;

        url.clone_into(&mut row.url);
        row.expires_at = expires_at;
        row.deleted = false;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let now = self.clock.system_time();
        let mut rows = self.rows.write();

        match rows.get_mut(id) {
            Some(row) if row.is_live(now) => {
                row.deleted = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn get(&self, id: &str) -> Result<String, StoreError> {
        let now = self.clock.system_time();

        self.rows
            .read()
            .get(id)
            .filter(|row| row.is_live(now))
            .map(|row| row.url.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list_reclaimable(&self, limit: Option<NonZeroUsize>) -> Result<Vec<String>, StoreError> {
        let now = self.clock.system_time();
        let limit = limit.map_or(usize::MAX, NonZeroUsize::get);

        Ok(self
            .rows
            .read()
            .iter()
            .filter(|(_, row)| !row.is_live(now))
            .map(|(id, _)| id.clone())
            .take(limit)
            .collect())
    }
}
