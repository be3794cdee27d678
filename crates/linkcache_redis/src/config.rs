// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and lease settings for [`RedisEngine`](crate::RedisEngine).
///
/// # Examples
///
/// ```
/// use linkcache_redis::RedisConfig;
///
/// let config: RedisConfig = serde_json::from_str(r#"{"url": "redis://cache:6379"}"#).unwrap();
/// assert_eq!(config.lease_ttl().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,

    /// How long a recompute lease lives before it is considered abandoned.
    pub lease_ttl_secs: u64,

    /// Maximum age of the last successful liveness probe before a `PING` is sent first.
    pub liveness_interval_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_owned(),
            lease_ttl_secs: 30,
            liveness_interval_secs: 60,
        }
    }
}

impl RedisConfig {
    /// Returns the lease TTL.
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    /// Returns the liveness probe interval.
    #[must_use]
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }
}
