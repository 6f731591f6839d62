//! Remote store trait and implementations.
//!
//! The pipeline never talks to remote storage directly; everything goes
//! through the `RemoteStore` trait so the SSH transport can be swapped for
//! an in-memory mock in tests.

#[cfg(feature = "mock")]
mod mock;
mod ssh;

#[cfg(feature = "mock")]
pub use self::mock::MockStore;
pub use self::ssh::{SshStore, parse_listing};
use crate::error::Result;
use crate::models::{HashKind, RemoteEntry};
use async_trait::async_trait;
use std::path::Path;

/// Unified interface to remote storage.
///
/// Covers the three collaborator contracts the catalog pipeline depends on:
/// the file lister, the sidecar/hash service, and the file fetcher. All
/// operations are single blocking round-trips awaited one at a time; each
/// implementation must enforce its own per-call deadline so a stuck remote
/// fails that call instead of hanging the run.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List all qualifying data files under the remote root.
    ///
    /// Implementations must filter to the expected data-file extension and
    /// drop any listed name that fails
    /// [`validate_name`](crate::validate_name) — a hostile or confused
    /// remote listing must not be able to inject traversal into the local
    /// mirror. Results are sorted by path for deterministic runs.
    async fn list(&self, root: &Path) -> Result<Vec<RemoteEntry>>;

    /// Read a small remote text file, such as a checksum sidecar.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) when the
    /// file does not exist.
    async fn read_text(&self, path: &Path) -> Result<String>;

    /// Compute a hash of a remote file on the remote host.
    ///
    /// Returns the raw command output (`<hash>  <path>` for coreutils);
    /// callers take the first whitespace-delimited token.
    async fn compute_hash(&self, path: &Path, kind: HashKind) -> Result<String>;

    /// Copy a remote file to a local destination path.
    ///
    /// The destination is written directly; callers that need atomicity
    /// fetch into a temporary name and rename afterwards.
    async fn fetch(&self, path: &Path, dest: &Path) -> Result<()>;
}
