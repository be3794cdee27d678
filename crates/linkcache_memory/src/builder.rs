// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory cache engines.
//!
//! The builder keeps moka's types out of the public API.

use std::time::Duration;

use tick::Clock;

use crate::engine::InMemoryEngine;

/// Builder for configuring an [`InMemoryEngine`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use linkcache_memory::InMemoryEngine;
/// use tick::Clock;
///
/// let engine = InMemoryEngine::builder(Clock::new_frozen())
///     .max_capacity(100_000)
///     .initial_capacity(1_024)
///     .lease_ttl(Duration::from_secs(30))
///     .name("links")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryEngineBuilder {
    pub(crate) clock: Clock,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) lease_ttl: Option<Duration>,
    pub(crate) name: Option<String>,
}

impl InMemoryEngineBuilder {
    /// Creates a builder for an unbounded engine without permission leases.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            max_capacity: None,
            initial_capacity: None,
            lease_ttl: None,
            name: None,
        }
    }

    /// Sets the maximum number of entries.
    ///
    /// Once reached, entries are evicted using moka's `TinyLFU` policy. Unbounded if not set.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the pre-allocation hint.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Makes recompute permissions lapse after `ttl`.
    ///
    /// Without a lease a permission is held until it is released.
    #[must_use]
    pub fn lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = Some(ttl);
        self
    }

    /// Sets a name that shows up in moka's debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> InMemoryEngine {
        InMemoryEngine::from_builder(self)
    }
}
