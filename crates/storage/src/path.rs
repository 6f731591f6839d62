//! File name validation for remote listings.
//!
//! The remote lister hands every discovered basename through here before it
//! enters the catalog. Anything that could escape a directory once joined
//! with a local root (separators, traversal, null bytes) is rejected.

use std::path::{Component, Path};

use crate::error::{ErrorKind, Result};

/// Validates a file name taken from a remote listing.
///
/// Listed names must be plain basenames: exactly one normal path component,
/// no `..`, no separators, no null bytes. Returns the name unchanged when
/// valid, or [`InvalidName`](crate::error::ErrorKind::InvalidName) otherwise.
///
/// # Examples
///
/// ```
/// use tiledepot_storage::validate_name;
/// assert!(validate_name("osm.20240101.versatiles").is_ok());
/// assert!(validate_name("../etc/passwd").is_err());
/// assert!(validate_name("subdir/file.versatiles").is_err());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<&str> {
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls — reject them explicitly.
    if name.contains('\0') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == std::ffi::OsStr::new(name) => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_name("osm.20240101.versatiles").unwrap(), "osm.20240101.versatiles");
        assert_eq!(validate_name("satellite.versatiles").unwrap(), "satellite.versatiles");
        assert_eq!(validate_name("name with spaces.versatiles").unwrap(), "name with spaces.versatiles");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate_name("..").is_err());
        assert!(validate_name("../osm.versatiles").is_err());
        assert!(validate_name("a/../b.versatiles").is_err());
    }

    #[test]
    fn test_subdirectory_components() {
        assert!(validate_name("subdir/file.versatiles").is_err());
        assert!(validate_name("/absolute.versatiles").is_err());
        assert!(validate_name("trailing.versatiles/").is_err());
    }

    #[test]
    fn test_junk() {
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("a\0b").is_err());
    }
}
