//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same pattern across every crate in this
//! workspace.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;
use tiledepot_storage::HashKind;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A hash was read before the hash cache populated it (programming error)
    #[display("{_1} hash is missing for file {_0:?}")]
    MissingHash(#[error(not(source))] String, HashKind),
    /// Neither the sidecar fetch nor remote computation produced a usable hash
    #[display("could not obtain {_1} hash for file {_0:?}")]
    HashUnobtainable(#[error(not(source))] String, HashKind),
    /// A manifest was requested for a group that has no latest file
    #[display("no latest file found in group {_0:?}")]
    NoLatestFile(#[error(not(source))] String),
    /// Public URL does not start with exactly one '/'
    #[display("url must start with a single '/', got: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    /// Manifest hash value is not valid hex
    #[display("invalid hex string: {_0:?}")]
    InvalidHex(#[error(not(source))] String),
    /// A file that should have a remote locator does not (programming error)
    #[display("file {_0:?} has no remote locator")]
    NoRemoteLocator(#[error(not(source))] String),
    /// Local hash-cache I/O failed
    #[display("hash cache I/O failed at {}", _0.display())]
    Cache(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache(_) | Self::Io(_))
    }
}
