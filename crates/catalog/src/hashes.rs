//! The hash cache.
//!
//! Ensures every catalogued file has verified md5/sha256 values before
//! anything is published. Per file and hash kind, the lookup ladder is:
//!
//! 1. the local cache tree (trusted without re-verification),
//! 2. a pre-existing sidecar file on remote storage,
//! 3. computing the hash on the remote host.
//!
//! Whatever was obtained is persisted to the local cache before the next
//! file, so a later run (or a resumed partial run) never repeats remote
//! work. A final pass re-reads every value from the cache into the in-memory
//! files, which keeps cache and memory in agreement even across a previous
//! partial run.

use crate::error::{ErrorKind, Result};
use crate::file::{FileRef, Hashes};
use exn::ResultExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tiledepot_storage::{HashKind, StoreHandle};
use tokio::fs;

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Local cache of remote hash values.
///
/// The cache is a directory tree mirroring the remote path structure, one
/// file per `{file, hash kind}` with content `<hash> <basename>`. Entries
/// are created on first use and never expire.
pub struct HashCache {
    store: StoreHandle,
    cache_root: PathBuf,
    remote_root: PathBuf,
}

impl HashCache {
    pub fn new(store: StoreHandle, cache_root: impl Into<PathBuf>, remote_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_root: cache_root.into(),
            remote_root: remote_root.into(),
        }
    }

    /// Populates `hashes` on every file, fetching or computing remotely at
    /// most once per file and hash kind.
    ///
    /// Fails the whole operation if any single file's hash cannot be
    /// obtained by any method — a partial catalog with missing hashes must
    /// never be published. Progress is reported in bytes of files whose
    /// hashes were not already cached, so the ETA tracks remaining remote
    /// cost rather than catalog size.
    pub async fn ensure_hashes(&self, files: &mut [FileRef]) -> Result<()> {
        tracing::info!(count = files.len(), "checking hashes");
        let mut todos: Vec<(usize, HashKind)> = Vec::new();
        for (position, file) in files.iter().enumerate() {
            for kind in HashKind::ALL {
                if !self.cached(file, kind).await? {
                    todos.push((position, kind));
                }
            }
        }

        if !todos.is_empty() {
            tracing::info!(missing = todos.len(), "resolving missing hashes");
            let total: u64 = todos.iter().map(|&(position, _)| files[position].size).sum();
            let progress = byte_progress(total);
            for (position, kind) in todos {
                let file = &files[position];
                let hash = self.obtain(file, kind).await?;
                self.persist(file, kind, &hash).await?;
                progress.inc(file.size);
            }
            progress.finish();
        }

        // Final pass: memory agrees with the cache, even if a previous
        // partial run wrote some of these entries.
        for file in files.iter_mut() {
            let md5 = self.read_cached(file, HashKind::Md5).await?;
            let sha256 = self.read_cached(file, HashKind::Sha256).await?;
            file.hashes = Some(Hashes { md5, sha256 });
        }
        Ok(())
    }

    /// Cache file for a `{file, kind}` pair: the remote locator with the
    /// storage root stripped, re-rooted under the cache directory, with the
    /// hash kind appended as an extension.
    fn cache_path(&self, file: &FileRef, kind: HashKind) -> Result<PathBuf> {
        let remote = match &file.remote_path {
            Some(remote) => remote,
            None => exn::bail!(ErrorKind::NoRemoteLocator(file.name.clone())),
        };
        let relative = remote
            .strip_prefix(&self.remote_root)
            .or_else(|_| remote.strip_prefix("/"))
            .unwrap_or(remote);
        Ok(self.cache_root.join(kind.sidecar_path(relative)))
    }

    async fn cached(&self, file: &FileRef, kind: HashKind) -> Result<bool> {
        let path = self.cache_path(file, kind)?;
        Ok(fs::try_exists(&path).await.map_err(|_| exn::Exn::from(ErrorKind::Cache(path)))?)
    }

    /// Sidecar fetch first, remote computation second. Output is usable when
    /// its first whitespace-delimited token is at least 32 characters — a
    /// deliberately loose floor shared by md5 (32) and sha256 (64) that only
    /// rejects empty or garbage output.
    async fn obtain(&self, file: &FileRef, kind: HashKind) -> Result<String> {
        let remote = match &file.remote_path {
            Some(remote) => remote,
            None => exn::bail!(ErrorKind::NoRemoteLocator(file.name.clone())),
        };

        match self.store.read_text(&kind.sidecar_path(remote)).await {
            Ok(text) => match usable_hash(&text) {
                Some(hash) => return Ok(hash.to_string()),
                None => tracing::debug!(file = file.name, %kind, "sidecar exists but is unusable"),
            },
            Err(err) => tracing::debug!(file = file.name, %kind, %err, "no remote sidecar"),
        }

        tracing::info!(file = file.name, %kind, "computing hash remotely");
        let output = self
            .store
            .compute_hash(remote, kind)
            .await
            .or_raise(|| ErrorKind::HashUnobtainable(file.name.clone(), kind))?;
        match usable_hash(&output) {
            Some(hash) => Ok(hash.to_string()),
            None => exn::bail!(ErrorKind::HashUnobtainable(file.name.clone(), kind)),
        }
    }

    async fn persist(&self, file: &FileRef, kind: HashKind, hash: &str) -> Result<()> {
        let path = self.cache_path(file, kind)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|_| exn::Exn::from(ErrorKind::Cache(parent.to_path_buf())))?;
        }
        fs::write(&path, format!("{hash} {}\n", file.name))
            .await
            .map_err(|_| exn::Exn::from(ErrorKind::Cache(path)))?;
        Ok(())
    }

    async fn read_cached(&self, file: &FileRef, kind: HashKind) -> Result<String> {
        let path = self.cache_path(file, kind)?;
        let content = fs::read_to_string(&path).await.map_err(|_| exn::Exn::from(ErrorKind::Cache(path)))?;
        match usable_hash(&content) {
            Some(hash) => Ok(hash.to_string()),
            None => exn::bail!(ErrorKind::HashUnobtainable(file.name.clone(), kind)),
        }
    }
}

/// First whitespace-delimited token, if it passes the 32-character sanity
/// floor.
fn usable_hash(output: &str) -> Option<&str> {
    output.split_whitespace().next().filter(|token| token.len() >= 32)
}

fn byte_progress(total: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(total).with_style(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tiledepot_storage::{MockStore, RemoteEntry};

    // md5/sha256 of the empty input.
    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn remote_file(name: &str, size: u64) -> FileRef {
        let entry = RemoteEntry::new(format!("/home/data/{name}"), name, size);
        FileRef::from_remote_listing(&entry).unwrap()
    }

    #[tokio::test]
    async fn test_hashes_from_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::with_files([
            ("/home/data/osm.versatiles", b"".to_vec()),
            ("/home/data/osm.versatiles.md5", format!("{EMPTY_MD5}  osm.versatiles\n").into_bytes()),
            ("/home/data/osm.versatiles.sha256", format!("{EMPTY_SHA256}  osm.versatiles\n").into_bytes()),
        ]));
        let cache = HashCache::new(store.clone(), tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();

        let hashes = files[0].hashes.as_ref().unwrap();
        assert_eq!(hashes.md5, EMPTY_MD5);
        assert_eq!(hashes.sha256, EMPTY_SHA256);
        // Sidecars were enough; nothing was computed remotely.
        assert_eq!(store.hash_computations(), 0);
        // The values were persisted to the cache tree.
        assert!(tmp.path().join("data/osm.versatiles.md5").exists());
        assert!(tmp.path().join("data/osm.versatiles.sha256").exists());
    }

    #[tokio::test]
    async fn test_hashes_computed_when_no_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::with_files([("/home/data/osm.versatiles", b"".to_vec())]).deny_sidecars());
        let cache = HashCache::new(store.clone(), tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();

        let hashes = files[0].hashes.as_ref().unwrap();
        assert_eq!(hashes.md5, EMPTY_MD5);
        assert_eq!(hashes.sha256, EMPTY_SHA256);
        assert_eq!(store.hash_computations(), 2);
    }

    #[tokio::test]
    async fn test_garbage_sidecar_falls_through_to_compute() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::with_files([
            ("/home/data/osm.versatiles", b"".to_vec()),
            // First token shorter than 32 characters: rejected.
            ("/home/data/osm.versatiles.md5", b"abc  osm.versatiles\n".to_vec()),
            ("/home/data/osm.versatiles.sha256", b"\n".to_vec()),
        ]));
        let cache = HashCache::new(store.clone(), tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();
        assert_eq!(files[0].hashes.as_ref().unwrap().md5, EMPTY_MD5);
        assert_eq!(store.hash_computations(), 2);
    }

    #[tokio::test]
    async fn test_cached_values_skip_remote_entirely() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::with_files([("/home/data/osm.versatiles", b"".to_vec())]).deny_sidecars());
        let cache = HashCache::new(store.clone(), tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();
        let first_run_computations = store.hash_computations();

        // Second run: everything comes from the cache tree.
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();
        assert_eq!(store.hash_computations(), first_run_computations);
        assert!(files[0].hashes.is_some());
    }

    #[tokio::test]
    async fn test_cached_values_trusted_without_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::with_files([("/home/data/osm.versatiles", b"".to_vec())]));
        // A pre-seeded (wrong but well-formed) cache entry wins over remote.
        let fake = "f".repeat(32);
        std::fs::create_dir_all(tmp.path().join("data")).unwrap();
        std::fs::write(tmp.path().join("data/osm.versatiles.md5"), format!("{fake} osm.versatiles\n")).unwrap();
        std::fs::write(
            tmp.path().join("data/osm.versatiles.sha256"),
            format!("{EMPTY_SHA256} osm.versatiles\n"),
        )
        .unwrap();

        let cache = HashCache::new(store.clone(), tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        cache.ensure_hashes(&mut files).await.unwrap();
        assert_eq!(files[0].hashes.as_ref().unwrap().md5, fake);
        assert_eq!(store.sidecar_reads(), 0);
        assert_eq!(store.hash_computations(), 0);
    }

    #[tokio::test]
    async fn test_unobtainable_hash_fails_naming_file_and_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(
            MockStore::with_files([("/home/data/osm.versatiles", b"".to_vec())])
                .deny_sidecars()
                .fail_hash_for("/home/data/osm.versatiles"),
        );
        let cache = HashCache::new(store, tmp.path(), "/home");
        let mut files = vec![remote_file("osm.versatiles", 0)];
        let err = cache.ensure_hashes(&mut files).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::HashUnobtainable(name, HashKind::Md5) if name == "osm.versatiles"));
        // Nothing was published into memory.
        assert!(files[0].hashes.is_none());
    }
}
