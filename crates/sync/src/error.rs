//! Sync Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same pattern across every crate in this
//! workspace.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Fetching a wanted file from remote storage failed
    #[display("fetch failed for {}", _0.display())]
    Fetch(#[error(not(source))] PathBuf),
    /// A wanted file has no remote locator to fetch from (programming error)
    #[display("file {_0:?} has no remote locator")]
    NoRemoteLocator(#[error(not(source))] String),
    /// Building the catalog record for a scanned local file failed
    #[display("invalid local file")]
    Catalog,
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
        matches!(self, Self::Fetch(_) | Self::Io(_))
    }
}
