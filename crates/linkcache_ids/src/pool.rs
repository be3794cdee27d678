// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Identifier issuing with recycling of reclaimed identifiers.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use anyspawn::{JoinHandle, Spawner};
use linkcache_tier::{Store, StoreError};
use serde::{Deserialize, Serialize};
use tick::{Clock, FutureExt};

use crate::alphabet::mint;
use crate::stack::IdStack;

/// Settings for an [`IdPool`].
///
/// # Examples
///
/// ```
/// use linkcache_ids::PoolConfig;
///
/// let config: PoolConfig = serde_json::from_str(r#"{"reclaim_limit": 500}"#).unwrap();
/// assert_eq!(config.reclaim_timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PoolConfig {
    /// Upper bound on how long one reclamation may wait for the store.
    pub reclaim_timeout_secs: u64,

    /// Maximum number of identifiers fetched per reclamation; unbounded if absent.
    pub reclaim_limit: Option<NonZeroUsize>,

    /// Pre-allocation hint for the identifier stack.
    pub initial_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reclaim_timeout_secs: 30,
            reclaim_limit: None,
            initial_capacity: 0,
        }
    }
}

impl PoolConfig {
    /// Returns the reclamation timeout.
    #[must_use]
    pub fn reclaim_timeout(&self) -> Duration {
        Duration::from_secs(self.reclaim_timeout_secs)
    }
}

/// How a reclamation run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReclaimOutcome {
    /// The store returned this many identifiers, now on the stack.
    Reclaimed(usize),
    /// The store failed; nothing was added.
    Failed(StoreError),
    /// The store did not answer within the reclamation timeout.
    TimedOut,
}

/// Resets the reclamation flag when dropped, including during unwinding.
struct ReclaimGuard(Arc<AtomicBool>);

impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct PoolInner<S> {
    store: S,
    stack: IdStack,
    reclaiming: Arc<AtomicBool>,
    spawner: Spawner,
    clock: Clock,
    config: PoolConfig,
}

/// Issues short identifiers, reusing reclaimed ones before minting new ones.
///
/// [`get`](Self::get) pops the most recently reclaimed identifier and re-points it with
/// [`Store::update`]. When the stack is empty it starts a reclamation in the background,
/// then mints a fresh identifier and [`Store::create`]s it without waiting for the
/// reclamation to finish.
///
/// At most one reclamation runs at a time per pool; it is bounded by
/// [`PoolConfig::reclaim_timeout`].
///
/// Clones share the same stack and store.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use anyspawn::Spawner;
/// use linkcache_ids::IdPool;
/// use linkcache_tier::testing::RecordingStore;
/// use tick::Clock;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), linkcache_tier::StoreError> {
/// let pool = IdPool::new(RecordingStore::new(), Spawner::new_tokio(), Clock::new_tokio());
/// pool.seed(["recycl".to_owned()]);
///
/// let expires_at = SystemTime::now() + Duration::from_secs(3600);
/// assert_eq!(pool.get("https://example.com", expires_at).await?, "recycl");
/// # Ok(())
/// # }
/// ```
pub struct IdPool<S> {
    inner: Arc<PoolInner<S>>,
}

impl<S> Clone for IdPool<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for IdPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdPool")
            .field("available", &self.inner.stack.len())
            .field("reclaiming", &self.inner.reclaiming.load(Ordering::Relaxed))
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<S> IdPool<S>
where
    S: Store + 'static,
{
    /// Creates a pool with default settings.
    #[must_use]
    pub fn new(store: S, spawner: Spawner, clock: Clock) -> Self {
        Self::with_config(store, PoolConfig::default(), spawner, clock)
    }

    /// Creates a pool with the given settings.
    #[must_use]
    pub fn with_config(store: S, config: PoolConfig, spawner: Spawner, clock: Clock) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                store,
                stack: IdStack::with_capacity(config.initial_capacity),
                reclaiming: Arc::new(AtomicBool::new(false)),
                spawner,
                clock,
                config,
            }),
        }
    }

    /// Returns an identifier now pointing at `url` until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns the store's error. A reclaimed identifier whose update failed is pushed back
    /// so it can be handed out again.
    pub async fn get(&self, url: &str, expires_at: SystemTime) -> Result<String, StoreError> {
        if let Some(id) = self.inner.stack.pop() {
            return match self.inner.store.update(&id, url, expires_at).await {
                Ok(()) => {
                    tracing::debug!(id = %id, "reused reclaimed identifier");
                    Ok(id)
                }
                Err(error) => {
                    tracing::warn!(id = %id, %error, "failed to re-point reclaimed identifier");
                    self.inner.stack.push(id);
                    Err(error)
                }
            };
        }

        // Detached: the handle is dropped and the run continues on the spawner.
        drop(self.reclaim());

        let id = mint(url, &self.inner.clock);
        self.inner.store.create(&id, url, expires_at).await?;
        tracing::debug!(id = %id, "minted new identifier");
        Ok(id)
    }

    /// Starts a reclamation unless one is already running.
    ///
    /// Returns `None` when another reclamation is in flight. The returned handle may be
    /// awaited for the outcome or dropped.
    ///
    /// # Panics
    ///
    /// Awaiting the handle panics if the store panicked during the run. The pool itself
    /// stays usable: the in-flight flag is reset either way.
    pub fn reclaim(&self) -> Option<JoinHandle<ReclaimOutcome>> {
        if self
            .inner
            .reclaiming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let guard = ReclaimGuard(Arc::clone(&self.inner.reclaiming));
        let inner = Arc::clone(&self.inner);

        Some(self.inner.spawner.spawn(async move {
            let _guard = guard;
            run_reclaim(&inner).await
        }))
    }

    /// Returns `true` while a reclamation is in flight.
    #[must_use]
    pub fn is_reclaiming(&self) -> bool {
        self.inner.reclaiming.load(Ordering::Acquire)
    }

    /// Returns the number of reclaimed identifiers waiting to be reused.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.stack.len()
    }

    /// Adds identifiers to the pool, for example ones known to be free at startup.
    pub fn seed(&self, ids: impl IntoIterator<Item = String>) {
        self.inner.stack.push_batch(ids);
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }
}

async fn run_reclaim<S: Store>(inner: &PoolInner<S>) -> ReclaimOutcome {
    let timeout = inner.config.reclaim_timeout();
    let listed = inner
        .store
        .list_reclaimable(inner.config.reclaim_limit)
        .timeout(&inner.clock, timeout)
        .await;

    match listed {
        Ok(Ok(ids)) => {
            let count = ids.len();
            inner.stack.push_batch(ids);
            tracing::info!(count, "reclaimed identifiers");
            ReclaimOutcome::Reclaimed(count)
        }
        Ok(Err(error)) => {
            tracing::error!(%error, "failed to list reclaimable identifiers");
            ReclaimOutcome::Failed(error)
        }
        Err(_elapsed) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "reclamation timed out");
            ReclaimOutcome::TimedOut
        }
    }
}
