// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Field names of the `cache.event` log record.
//!
//! The `tracing` macros need literal field names, so these constants only exist to keep
//! the tests honest about what the macros emit.

#[cfg(test)]
pub(crate) const CACHE_NAME: &str = "cache.name";

#[cfg(test)]
pub(crate) const CACHE_KEY: &str = "cache.key";

#[cfg(test)]
pub(crate) const CACHE_EVENT_NAME: &str = "cache.event";

#[cfg(test)]
pub(crate) const CACHE_OPERATION_NAME: &str = "cache.operation";

#[cfg(test)]
pub(crate) const CACHE_ACTIVITY_NAME: &str = "cache.activity";

#[cfg(test)]
pub(crate) const CACHE_DURATION_NAME: &str = "cache.duration_ns";

#[cfg(test)]
pub(crate) const CACHE_ERROR: &str = "cache.error";
