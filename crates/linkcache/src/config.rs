// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable cache settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a caller does when it misses the cache while another caller is recomputing the
/// same key.
///
/// # Examples
///
/// ```
/// use linkcache::ContentionPolicy;
///
/// let policy: ContentionPolicy =
///     serde_json::from_str(r#"{"retry": {"attempts": 3, "backoff_ms": 20}}"#).unwrap();
/// assert_eq!(policy, ContentionPolicy::Retry { attempts: 3, backoff_ms: 20 });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ContentionPolicy {
    /// Answer `NotFound` right away.
    #[default]
    Reject,
    /// Sleep `backoff_ms` and look at the cache again, up to `attempts` times, before
    /// answering `NotFound`.
    Retry {
        /// Number of additional cache lookups.
        attempts: u32,
        /// Pause before each lookup, in milliseconds.
        backoff_ms: u64,
    },
}

impl ContentionPolicy {
    /// Returns the retry policy with the given attempts and backoff.
    #[must_use]
    pub fn retry(attempts: u32, backoff: Duration) -> Self {
        Self::Retry {
            attempts,
            backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Which engine backs the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EngineConfig {
    /// A process-local moka cache.
    #[default]
    Memory,
    /// A shared Redis server.
    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    Redis(linkcache_redis::RedisConfig),
}

/// Settings for a [`CachedStore`](crate::CachedStore) and the engine behind it.
///
/// Durations are given in whole seconds so the settings read naturally in configuration
/// files; the accessor methods convert them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache::{CacheConfig, ContentionPolicy};
///
/// let config: CacheConfig = serde_json::from_str(
///     r#"{
///         "negative_ttl_secs": 60,
///         "max_capacity": 100000,
///         "contention": "reject"
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.found_ttl(), Duration::from_secs(24 * 60 * 60));
/// assert_eq!(config.negative_ttl(), Duration::from_secs(60));
/// assert_eq!(config.contention, ContentionPolicy::Reject);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// How long a successful lookup stays cached.
    pub found_ttl_secs: u64,

    /// How long a failed lookup stays cached.
    pub negative_ttl_secs: u64,

    /// How often the local engine evicts expired entries and lapsed permissions.
    /// Zero disables the sweeper.
    pub sweep_interval_secs: u64,

    /// How long a recompute permission lives before it is considered abandoned.
    pub lease_ttl_secs: u64,

    /// Upper bound on locally cached entries; unbounded if absent.
    pub max_capacity: Option<u64>,

    /// Behavior of callers that lose the recompute race.
    pub contention: ContentionPolicy,

    /// The engine to build.
    pub engine: EngineConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            found_ttl_secs: 24 * 60 * 60,
            negative_ttl_secs: 60 * 60,
            sweep_interval_secs: 24 * 60 * 60,
            lease_ttl_secs: 30,
            max_capacity: None,
            contention: ContentionPolicy::Reject,
            engine: EngineConfig::Memory,
        }
    }
}

impl CacheConfig {
    /// Returns the TTL of successful entries.
    #[must_use]
    pub fn found_ttl(&self) -> Duration {
        Duration::from_secs(self.found_ttl_secs)
    }

    /// Returns the TTL of negative entries.
    #[must_use]
    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }

    /// Returns the sweep interval, or `None` if sweeping is disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Returns the permission lease TTL.
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}
