//! In-memory remote store for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{HashKind, RemoteEntry};
use crate::path::validate_name;
use crate::store::RemoteStore;
use async_trait::async_trait;
use sha2::Digest;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory remote store for testing.
///
/// Remote files live in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. The
/// mock hasher produces real md5/sha256 digests in `md5sum`-style output,
/// which lets hash-cache tests exercise the "first whitespace token"
/// parsing against realistic lines.
///
/// Call counters are kept so tests can assert that cached values avoid
/// remote round-trips.
pub struct MockStore {
    name: String,
    extension: String,
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    deny_sidecars: bool,
    fail_hashes: HashSet<PathBuf>,
    fail_fetches: HashSet<PathBuf>,
    sidecar_reads: AtomicUsize,
    hash_computations: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockStore {
    /// Create a mock store pre-populated with remote files.
    ///
    /// Paths are full remote locators (e.g. `/home/osm/osm.20240101.versatiles`).
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let map = files.into_iter().map(|(path, data)| (path.into(), data.into())).collect();
        Self {
            name: "mock".to_string(),
            extension: "versatiles".to_string(),
            files: RwLock::new(map),
            deny_sidecars: false,
            fail_hashes: HashSet::new(),
            fail_fetches: HashSet::new(),
            sidecar_reads: AtomicUsize::new(0),
            hash_computations: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Make every `read_text` call fail with `NotFound`, forcing callers
    /// down the compute-hash fallback.
    pub fn deny_sidecars(mut self) -> Self {
        self.deny_sidecars = true;
        self
    }

    /// Make `compute_hash` fail for the given remote path.
    pub fn fail_hash_for(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_hashes.insert(path.into());
        self
    }

    /// Make `fetch` fail for the given remote path.
    pub fn fail_fetch_for(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_fetches.insert(path.into());
        self
    }

    pub fn sidecar_reads(&self) -> usize {
        self.sidecar_reads.load(Ordering::SeqCst)
    }

    pub fn hash_computations(&self) -> usize {
        self.hash_computations.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn digest(bytes: &[u8], kind: HashKind) -> String {
        match kind {
            HashKind::Md5 => format!("{:x}", md5::compute(bytes)),
            HashKind::Sha256 => format!("{:x}", sha2::Sha256::digest(bytes)),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, root: &Path) -> Result<Vec<RemoteEntry>> {
        let suffix = format!(".{}", self.extension);
        let guard = self.files.read().await;
        let mut entries: Vec<RemoteEntry> = guard
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .filter_map(|(path, data)| {
                let name = path.file_name()?.to_str()?;
                if !name.ends_with(&suffix) {
                    return None;
                }
                validate_name(name).ok()?;
                Some(RemoteEntry::new(path.clone(), name, data.len() as u64))
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read_text(&self, path: &Path) -> Result<String> {
        self.sidecar_reads.fetch_add(1, Ordering::SeqCst);
        if self.deny_sidecars {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let guard = self.files.read().await;
        let data = guard.get(path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?;
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    async fn compute_hash(&self, path: &Path, kind: HashKind) -> Result<String> {
        self.hash_computations.fetch_add(1, Ordering::SeqCst);
        if self.fail_hashes.contains(path) {
            exn::bail!(ErrorKind::Remote(format!("{} failed for {}", kind.command(), path.display())));
        }
        let guard = self.files.read().await;
        let data = guard.get(path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?;
        // Two spaces between hash and path, like coreutils.
        Ok(format!("{}  {}\n", Self::digest(data, kind), path.display()))
    }

    async fn fetch(&self, path: &Path, dest: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.contains(path) {
            exn::bail!(ErrorKind::Remote(format!("scp of {} failed", path.display())));
        }
        let data = {
            let guard = self.files.read().await;
            guard.get(path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())))?
        };
        tokio::fs::write(dest, data).await.map_err(ErrorKind::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_filters_extension_and_root() {
        let store = MockStore::with_files([
            ("/home/osm/osm.20240101.versatiles", b"aaaa".to_vec()),
            ("/home/osm/osm.20240101.versatiles.md5", b"junk".to_vec()),
            ("/home/osm/readme.txt", b"junk".to_vec()),
            ("/elsewhere/other.versatiles", b"junk".to_vec()),
        ]);
        let entries = store.list(Path::new("/home")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "osm.20240101.versatiles");
        assert_eq!(entries[0].size, 4);
    }

    #[tokio::test]
    async fn test_compute_hash_matches_coreutils_shape() {
        let store = MockStore::with_files([("/home/f.versatiles", b"".to_vec())]);
        let out = store.compute_hash(Path::new("/home/f.versatiles"), HashKind::Md5).await.unwrap();
        let token = out.split_whitespace().next().unwrap();
        // md5 of the empty input
        assert_eq!(token, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(store.hash_computations(), 1);
    }

    #[tokio::test]
    async fn test_deny_sidecars() {
        let store = MockStore::with_files([("/home/f.versatiles.md5", b"abc".to_vec())]).deny_sidecars();
        let err = store.read_text(Path::new("/home/f.versatiles.md5")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("local.versatiles");
        let store = MockStore::with_files([("/home/f.versatiles", b"payload".to_vec())]);
        store.fetch(Path::new("/home/f.versatiles"), &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_injection() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::with_files([("/home/f.versatiles", b"payload".to_vec())])
            .fail_fetch_for("/home/f.versatiles");
        let err = store.fetch(Path::new("/home/f.versatiles"), &dir.path().join("x")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Remote(_)));
    }
}
