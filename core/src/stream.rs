//! Journal stream identification and versioning.
//!
//! Every aggregate instance owns exactly one stream in the journal. The ledger uses
//! three kinds of streams:
//!
//! - `clubs`: every club registration, in commit order
//! - `events`: every event creation, in commit order
//! - `event-<id>`: the ticket sales and opt-ins of a single event
//!
//! A stream's [`Version`] is the number of facts committed to it so far.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Identifier of a journal stream (one aggregate instance).
///
/// `FromStr` validates (rejects empty and whitespace-bearing names); `new()` and
/// `From` do not and are meant for identifiers built by the application itself.
///
/// ```
/// use clubticket_core::stream::StreamId;
///
/// let stream = StreamId::new("event-7");
/// assert_eq!(stream.as_str(), "event-7");
///
/// assert!("".parse::<StreamId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new `StreamId` from trusted input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The stream ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the `StreamId`, returning its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseStreamIdError("stream ID cannot be empty".to_string()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ParseStreamIdError(format!(
                "stream ID cannot contain whitespace: {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of facts committed to a stream.
///
/// A fresh stream is at [`Version::INITIAL`]. Appending `n` facts with an expected
/// version `v` moves the stream to `v + n`; appending with a stale expected version
/// is a concurrency conflict.
///
/// ```
/// use clubticket_core::stream::Version;
///
/// let v = Version::INITIAL.next().next();
/// assert_eq!(v.value(), 2);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a stream with no committed facts.
    pub const INITIAL: Self = Self(0);

    /// Create a `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version after one more fact.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The version after `count` more facts.
    #[must_use]
    pub const fn advance(self, count: u64) -> Self {
        Self(self.0 + count)
    }

    /// Whether no fact has been committed yet.
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}
