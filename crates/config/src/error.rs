//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A provider (file, env) could not be read or parsed
    #[display("could not load configuration: {_0}")]
    Load(figment::Error),
    /// The loaded configuration is structurally valid but unusable
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}

impl ErrorKind {
    /// Configuration problems require operator intervention.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
