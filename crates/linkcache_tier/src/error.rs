// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache engine operations.

use std::fmt;

/// Broad classification of a cache engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An entry could not be encoded for, or decoded from, the backing storage.
    Serialization,
    /// The lease script returned a value outside of its documented protocol.
    UnexpectedScriptResult,
    /// The backing storage could not be reached or rejected the command.
    Transport,
}

impl ErrorKind {
    /// Returns a stable, lowercase name suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serialization => "serialization",
            Self::UnexpectedScriptResult => "unexpected_script_result",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache engine.
///
/// Engine errors never reach the users of the caching decorator; they are logged
/// and the request degrades to a cache miss. The [`ErrorKind`] is kept so that
/// logs and tests can tell transport trouble apart from protocol violations.
///
/// # Example
///
/// ```
/// use linkcache_tier::{Error, ErrorKind};
///
/// let error = Error::transport("connection refused");
/// assert_eq!(error.kind(), ErrorKind::Transport);
/// ```
#[ohno::error]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error of the given kind caused by `cause`.
    pub fn with_kind(kind: ErrorKind, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(kind, cause)
    }

    /// Creates a transport error. This is the catch-all for failures of external engines.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Transport, cause)
    }

    /// Creates a transport error.
    pub fn transport(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Transport, cause)
    }

    /// Creates a serialization error.
    pub fn serialization(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Serialization, cause)
    }

    /// Creates an error for a lease script reply outside of `{0, 1}`.
    #[must_use]
    pub fn unexpected_script_result(reply: i64) -> Self {
        Self::caused_by(
            ErrorKind::UnexpectedScriptResult,
            format!("lease script returned unexpected value {reply}"),
        )
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A specialized [`Result`] type for cache engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_cause_message() {
        let error = Error::transport("broken pipe");
        let display = format!("{error}");
        assert!(display.contains("broken pipe"), "got: {display}");
    }

    #[test]
    fn unexpected_script_result_reports_reply() {
        let error = Error::unexpected_script_result(-1);
        assert_eq!(error.kind(), ErrorKind::UnexpectedScriptResult);
        assert!(format!("{error}").contains("-1"));
    }

    #[test]
    fn from_message_is_transport() {
        assert_eq!(Error::from_message("x").kind(), ErrorKind::Transport);
        assert_eq!(Error::serialization("x").kind(), ErrorKind::Serialization);
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ErrorKind::Serialization.to_string(), "serialization");
        assert_eq!(ErrorKind::UnexpectedScriptResult.as_str(), "unexpected_script_result");
        assert_eq!(ErrorKind::Transport.as_str(), "transport");
    }
}
