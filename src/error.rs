//! Pipeline Error Types

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories for the orchestrated run.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or is invalid
    #[display("configuration error")]
    Config,
    /// Remote discovery found nothing to catalog
    #[display("no remote data files found under {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    /// A file's integrity hashes could not be obtained
    #[display("integrity error")]
    Integrity,
    /// The local mirror could not be brought up to date
    #[display("mirror sync error")]
    Mirror,
    /// Catalog records or responses could not be assembled
    #[display("catalog assembly error")]
    Catalog,
    /// The web server configuration could not be rendered
    #[display("config rendering error")]
    Render,
    /// A run was triggered while another was still in flight
    #[display("an update run is already in progress")]
    AlreadyRunning,
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
