// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::StoreError;

/// A cached store outcome: either the resolved URL or the error the store returned.
///
/// Entries are immutable once written; a re-set replaces the whole entry. Caching
/// failures lets a hot key that does not exist be answered without touching the store.
///
/// # Examples
///
/// ```
/// use linkcache_tier::{Entry, StoreError};
///
/// let hit = Entry::found("https://example.com");
/// assert_eq!(hit.url(), Some("https://example.com"));
///
/// let miss = Entry::failed(StoreError::NotFound);
/// assert!(miss.is_negative());
/// assert_eq!(miss.into_result(), Err(StoreError::NotFound));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    outcome: Result<String, StoreError>,
}

impl Entry {
    /// Creates an entry for a successful lookup.
    pub fn found(url: impl Into<String>) -> Self {
        Self { outcome: Ok(url.into()) }
    }

    /// Creates an entry for a failed lookup.
    #[must_use]
    pub fn failed(error: StoreError) -> Self {
        Self { outcome: Err(error) }
    }

    /// Returns the URL for a successful entry.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    /// Returns the cached error for a negative entry.
    #[must_use]
    pub fn error(&self) -> Option<&StoreError> {
        self.outcome.as_ref().err()
    }

    /// Returns `true` if the entry caches a failure.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.outcome.is_err()
    }

    /// Borrows the cached outcome.
    #[must_use]
    pub fn as_result(&self) -> Result<&str, &StoreError> {
        self.outcome.as_deref()
    }

    /// Consumes the entry, returning the cached outcome.
    #[must_use]
    pub fn into_result(self) -> Result<String, StoreError> {
        self.outcome
    }
}

impl From<Result<String, StoreError>> for Entry {
    fn from(outcome: Result<String, StoreError>) -> Self {
        Self { outcome }
    }
}
