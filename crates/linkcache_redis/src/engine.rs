// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Redis-backed cache engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use linkcache_tier::{CacheEngine, Entry, Error, PermissionGate};
use parking_lot::Mutex;
use redis::Script;
use redis::aio::ConnectionManager;
use tick::Clock;

use crate::codec::{decode_entry, encode_entry, ttl_seconds};
use crate::config::RedisConfig;
use crate::lease::{ACQUIRE_SCRIPT, classify_reply, lease_key};

/// Tracks when the connection was last known to be alive.
#[derive(Debug)]
pub(crate) struct LivenessProbe {
    interval: Duration,
    last_ok: Mutex<Option<Instant>>,
}

impl LivenessProbe {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_ok: Mutex::new(None),
        }
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.last_ok
            .lock()
            .is_none_or(|last| now.saturating_duration_since(last) > self.interval)
    }

    pub(crate) fn mark_ok(&self, now: Instant) {
        *self.last_ok.lock() = Some(now);
    }
}

struct RedisInner {
    connection: ConnectionManager,
    acquire_script: Script,
    lease_ttl_secs: u64,
    probe: LivenessProbe,
    clock: Clock,
}

impl std::fmt::Debug for RedisInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisInner")
            .field("lease_ttl_secs", &self.lease_ttl_secs)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

/// A cache engine shared across processes through Redis.
///
/// Entries are JSON records written with `SET key payload EX seconds`. Recompute
/// permissions are leases on `lease:<key>` taken by a single Lua script, so two processes
/// can never both hold one, and a crashed holder's lease lapses on its own.
///
/// The connection goes through a [`ConnectionManager`], which multiplexes commands and
/// reconnects on failure. Before a command, if the last successful probe is older than
/// the configured liveness interval, a `PING` is sent first.
///
/// Clones share the same connection.
#[derive(Debug, Clone)]
pub struct RedisEngine {
    inner: Arc<RedisInner>,
}

impl RedisEngine {
    /// Connects to the Redis server named in `config`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the URL is invalid or the server cannot be reached.
    pub async fn connect(config: &RedisConfig, clock: Clock) -> Result<Self, Error> {
        let client = redis::Client::open(config.url.as_str()).map_err(Error::transport)?;
        let connection = ConnectionManager::new(client).await.map_err(Error::transport)?;

        tracing::info!(url = %config.url, "connected cache engine to redis");
        Ok(Self::from_connection(connection, config, clock))
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn from_connection(connection: ConnectionManager, config: &RedisConfig, clock: Clock) -> Self {
        let probe = LivenessProbe::new(config.liveness_interval());
        probe.mark_ok(clock.instant());

        Self {
            inner: Arc::new(RedisInner {
                connection,
                acquire_script: Script::new(ACQUIRE_SCRIPT),
                lease_ttl_secs: ttl_seconds(config.lease_ttl()),
                probe,
                clock,
            }),
        }
    }

    /// Returns a connection, probing it first if it has been quiet for too long.
    async fn connection(&self) -> Result<ConnectionManager, Error> {
        let mut connection = self.inner.connection.clone();

        let now = self.inner.clock.instant();
        if self.inner.probe.is_due(now) {
            let _pong: String = redis::cmd("PING")
                .query_async(&mut connection)
                .await
                .map_err(Error::transport)?;
            self.inner.probe.mark_ok(now);
        }

        Ok(connection)
    }
}

impl PermissionGate for RedisEngine {
    async fn acquire(&self, key: &str) -> Result<bool, Error> {
        let mut connection = self.connection().await?;

        let reply: i64 = self
            .inner
            .acquire_script
            .key(lease_key(key))
            .arg(1)
            .arg(self.inner.lease_ttl_secs)
            .invoke_async(&mut connection)
            .await
            .map_err(Error::transport)?;

        classify_reply(reply)
    }

    async fn release(&self, key: &str) -> Result<(), Error> {
        let mut connection = self.connection().await?;

        let _removed: i64 = redis::cmd("DEL")
            .arg(lease_key(key))
            .query_async(&mut connection)
            .await
            .map_err(Error::transport)?;
        Ok(())
    }
}

impl CacheEngine for RedisEngine {
    async fn get(&self, key: &str) -> Result<Option<Entry>, Error> {
        let mut connection = self.connection().await?;

        let payload: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::transport)?;

        payload.as_deref().map(decode_entry).transpose()
    }

    async fn set(&self, key: &str, entry: Entry, ttl: Duration) -> Result<(), Error> {
        if ttl.is_zero() {
            return self.delete(key).await;
        }

        let payload = encode_entry(&entry)?;
        let mut connection = self.connection().await?;

        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async::<()>(&mut connection)
            .await
            .map_err(Error::transport)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut connection = self.connection().await?;

        let _removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::transport)?;
        Ok(())
    }
}
