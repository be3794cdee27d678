// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The persistent key→URL store contract.

use std::num::NonZeroUsize;
use std::time::SystemTime;

/// Message used for the distinguished "no such record" outcome.
///
/// This text doubles as the wire form of [`StoreError::NotFound`] in serialized cache entries.
pub const NOT_FOUND_MESSAGE: &str = "record not found";

const UNKNOWN_FAILURE_MESSAGE: &str = "unknown store failure";

/// The outcome of a failed store operation.
///
/// Store errors are values: they are cached, compared, and reproduced verbatim
/// on later cache hits, so they carry only a message and no source chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The identifier does not exist, was deleted, or has expired.
    #[error("record not found")]
    NotFound,
    /// Any other failure reported by the store.
    #[error("{0}")]
    Failed(String),
}

impl StoreError {
    /// Creates an opaque store failure.
    ///
    /// An empty message is replaced with a placeholder so that the failure can never be
    /// mistaken for a success once serialized.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Failed(UNKNOWN_FAILURE_MESSAGE.to_owned())
        } else {
            Self::Failed(message)
        }
    }

    /// Reconstructs a store error from its display text.
    ///
    /// The inverse of `to_string()`: the not-found message maps back to [`StoreError::NotFound`].
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        if message == NOT_FOUND_MESSAGE {
            Self::NotFound
        } else {
            Self::failed(message)
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// A persistent key→URL store.
///
/// Implementations are external collaborators (typically a relational database). The
/// caching decorator implements this trait itself, so a cached store can be used anywhere a
/// plain one is expected.
///
/// Every method is fallible with [`StoreError`]; lookups of unknown, deleted, or expired
/// identifiers fail with [`StoreError::NotFound`].
pub trait Store: Send + Sync {
    /// Inserts a new mapping. Fails if the identifier already exists.
    fn create(&self, id: &str, url: &str, expires_at: SystemTime) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Re-points an existing identifier, reviving it if it was deleted or expired.
    fn update(&self, id: &str, url: &str, expires_at: SystemTime) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Marks the identifier as deleted.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Resolves an identifier to its URL.
    fn get(&self, id: &str) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Lists identifiers that may be handed out again: deleted or expired ones.
    ///
    /// `None` means no limit.
    fn list_reclaimable(&self, limit: Option<NonZeroUsize>) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_matches_wire_message() {
        assert_eq!(StoreError::NotFound.to_string(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn from_message_recovers_not_found() {
        assert_eq!(StoreError::from_message("record not found"), StoreError::NotFound);
        assert_eq!(
            StoreError::from_message("connection reset"),
            StoreError::Failed("connection reset".to_owned())
        );
    }

    #[test]
    fn empty_failure_gets_placeholder() {
        let error = StoreError::failed("");
        assert_eq!(error.to_string(), "unknown store failure");
        assert!(!error.is_not_found());
    }
}
