//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same pattern across every crate in this
//! workspace.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Remote file does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Underlying I/O error (spawning subprocesses, writing fetched bytes)
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The remote side rejected or failed the command
    #[display("remote command failed: {_0}")]
    Remote(#[error(not(source))] String),
    /// A remote round-trip exceeded its deadline
    #[display("remote call timed out after {_1:?}: {_0}")]
    Timeout(#[error(not(source))] String, std::time::Duration),
    /// Listed name contains path separators, traversal or other junk
    #[display("invalid file name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Remote(_) | Self::Timeout(_, _))
    }
}
