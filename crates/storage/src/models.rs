//! Storage models.
//!
//! Plain metadata records exchanged with the remote storage collaborators.

use std::path::{Path, PathBuf};

/// One file discovered by the remote lister.
///
/// The `path` is the locator on remote storage (absolute, as reported by the
/// remote shell); `name` is the validated basename used for grouping and
/// mirror reconciliation downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Full path on remote storage
    pub path: PathBuf,
    /// Validated basename (no separators, no traversal)
    pub name: String,
    /// File size in bytes, as reported by the remote listing
    pub size: u64,
}
impl RemoteEntry {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
        }
    }
}

/// The two checksum kinds tracked for every catalogued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    Md5,
    Sha256,
}
impl HashKind {
    pub const ALL: [HashKind; 2] = [HashKind::Md5, HashKind::Sha256];

    /// Sidecar file extension (also used for the local cache tree).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Name of the coreutils command that computes this hash on the remote host.
    pub fn command(self) -> &'static str {
        match self {
            Self::Md5 => "md5sum",
            Self::Sha256 => "sha256sum",
        }
    }

    /// The sidecar path for a given data file (`<path>.<ext>`).
    pub fn sidecar_path(self, path: &Path) -> PathBuf {
        let mut os = path.as_os_str().to_os_string();
        os.push(".");
        os.push(self.extension());
        PathBuf::from(os)
    }
}
impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_appends_extension() {
        assert_eq!(
            HashKind::Md5.sidecar_path(Path::new("/home/osm/osm.20240101.versatiles")),
            PathBuf::from("/home/osm/osm.20240101.versatiles.md5")
        );
        assert_eq!(
            HashKind::Sha256.sidecar_path(Path::new("rel/file.versatiles")),
            PathBuf::from("rel/file.versatiles.sha256")
        );
    }

    #[test]
    fn commands_match_coreutils() {
        assert_eq!(HashKind::Md5.command(), "md5sum");
        assert_eq!(HashKind::Sha256.command(), "sha256sum");
    }
}
