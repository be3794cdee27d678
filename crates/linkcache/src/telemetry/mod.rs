// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging of cache decisions.
//!
//! Every decorator operation ends in one `cache.event` record carrying the cache name,
//! the key, the operation, what happened, and how long it took. The severity follows the
//! activity, so a production filter at `info` sees recomputes and failures but not hits.

use std::fmt::Display;
use std::time::Duration;

pub(crate) mod attributes;
#[cfg(test)]
pub(crate) mod testing;

/// Default name used when none is given to the builder.
pub(crate) const DEFAULT_CACHE_NAME: &str = "linkcache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Create,
    Update,
    Delete,
    ListReclaimable,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Create => "cache.create",
            Self::Update => "cache.update",
            Self::Delete => "cache.delete",
            Self::ListReclaimable => "cache.list_reclaimable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    /// A cached URL was returned.
    Hit,
    /// A cached store error was returned.
    NegativeHit,
    Miss,
    /// This caller held the permission and refreshed the entry from the store.
    Recomputed,
    /// Another caller holds the permission.
    Contended,
    /// A write went through and the entry was cached.
    Populated,
    /// Nothing was cached: the write's expiry was already past, or a write overlapped
    /// the recompute.
    Skipped,
    Invalidated,
    Ok,
    StoreError,
    EngineError,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::NegativeHit => "cache.negative_hit",
            Self::Miss => "cache.miss",
            Self::Recomputed => "cache.recompute",
            Self::Contended => "cache.contended",
            Self::Populated => "cache.populated",
            Self::Skipped => "cache.skipped",
            Self::Invalidated => "cache.invalidated",
            Self::Ok => "cache.ok",
            Self::StoreError => "cache.store_error",
            Self::EngineError => "cache.engine_error",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::NegativeHit | Self::Miss | Self::Ok => Severity::Debug,
            Self::Recomputed | Self::Populated | Self::Skipped | Self::Invalidated => Severity::Info,
            Self::Contended | Self::StoreError => Severity::Warn,
            Self::EngineError => Severity::Error,
        }
    }
}

/// Emits `cache.event` records for one cache instance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheTelemetry {
    name: &'static str,
    logging_enabled: bool,
}

impl CacheTelemetry {
    pub fn new(name: &'static str, logging_enabled: bool) -> Self {
        Self { name, logging_enabled }
    }

    pub fn name(self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn record(self, key: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        if self.logging_enabled {
            emit(self.name, key, operation, activity, duration, None);
        }
    }

    /// Records a failed engine call. Emitted even when logging is turned off.
    pub fn record_engine_error(self, key: &str, operation: CacheOperation, error: &dyn Display) {
        emit(self.name, key, operation, CacheActivity::EngineError, None, Some(error));
    }
}

fn emit(
    cache_name: &'static str,
    key: &str,
    operation: CacheOperation,
    activity: CacheActivity,
    duration: Option<Duration>,
    error: Option<&dyn Display>,
) {
    let op = operation.as_str();
    let ev = activity.as_str();
    let duration_ns = duration.map(|d| d.as_nanos());
    let error = error.map(tracing::field::display);

    // The level must be a constant in each macro call.
    // Field names must match attributes.rs.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                cache.name = cache_name,
                cache.key = key,
                cache.operation = op,
                cache.activity = ev,
                cache.duration_ns = ?duration_ns,
                cache.error = error,
                "cache.event"
            )
        };
    }

    match activity.severity() {
        Severity::Error => emit_event!(error),
        Severity::Warn => emit_event!(warn),
        Severity::Info => emit_event!(info),
        Severity::Debug => emit_event!(debug),
    }
}
