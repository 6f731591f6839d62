//! The orchestrated update run.
//!
//! One run takes the catalog from remote listing to written web server
//! configuration:
//!
//! 1. list the remote storage root (empty listing is fatal),
//! 2. ensure md5/sha256 hashes for every file via the hash cache,
//! 3. group files into release tracks and promote latest versions,
//! 4. mirror the latest file of mirror-flagged groups to the local volume,
//! 5. catalog pre-rendered content pages from the content volume,
//! 6. assemble checksum stubs and url-list manifests,
//! 7. render and write the nginx configuration.
//!
//! Steps run strictly in this order; any failure aborts the run and leaves
//! the previously written configuration untouched.

use crate::error::{ErrorKind, Result};
use crate::nginx;
use exn::ResultExt;
use std::path::Path;
use tiledepot_catalog::{CatalogEntry, FileRef, HashCache, collect_files, group_files};
use tiledepot_config::Config;
use tiledepot_storage::StoreHandle;
use tokio::fs;

pub async fn run(config: &Config, store: &StoreHandle) -> Result<()> {
    let remote_root = &config.remote.root;
    let entries =
        store.list(remote_root).await.or_raise(|| ErrorKind::Discovery(remote_root.clone()))?;
    let mut files = entries
        .iter()
        .map(FileRef::from_remote_listing)
        .collect::<tiledepot_catalog::error::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Catalog)?;
    if files.is_empty() {
        exn::bail!(ErrorKind::Discovery(remote_root.clone()));
    }
    tracing::info!(count = files.len(), "discovered remote data files");

    let cache = HashCache::new(store.clone(), config.hash_cache_dir(), remote_root);
    cache.ensure_hashes(&mut files).await.or_raise(|| ErrorKind::Integrity)?;

    let mut groups = group_files(files);
    tiledepot_sync::mirror_groups(&mut groups, &config.tiles_dir(), store, &config.extension)
        .await
        .or_raise(|| ErrorKind::Mirror)?;

    let content_files = scan_content(&config.content_dir()).await?;

    let base_url = config.base_url();
    let mut responses = Vec::new();
    for group in &groups {
        responses.extend(group.responses(&base_url).or_raise(|| ErrorKind::Catalog)?);
    }

    let public_files = collect_files([CatalogEntry::from(groups), CatalogEntry::from(content_files)]);

    nginx::write_conf(config, &public_files, &responses).await?;
    tracing::info!(files = public_files.len(), responses = responses.len(), "update complete");
    Ok(())
}

/// Catalogs pre-rendered content pages (HTML, feeds) from the content
/// volume. A missing directory simply means there is no content yet.
async fn scan_content(dir: &Path) -> Result<Vec<FileRef>> {
    if !fs::try_exists(dir).await.map_err(ErrorKind::Io)? {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir).await.map_err(ErrorKind::Io)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
        let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
        if !metadata.is_file() {
            continue;
        }
        files.push(FileRef::from_local_scan(entry.path(), metadata.len()).or_raise(|| ErrorKind::Catalog)?);
    }
    files.sort_by(|a, b| a.url.cmp(&b.url));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tiledepot_config::RemoteConfig;
    use tiledepot_storage::MockStore;

    fn test_config(volume_dir: &Path) -> Config {
        Config {
            domain: "download.example.org".to_string(),
            volume_dir: volume_dir.to_path_buf(),
            remote: RemoteConfig {
                host: "storage.example.org".to_string(),
                webdav_url: "https://storage.example.org/webdav".to_string(),
                ..RemoteConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_empty_listing_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let store: StoreHandle = Arc::new(MockStore::default());
        let err = run(&test_config(tmp.path()), &store).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Discovery(_)));
        // Nothing was written.
        assert!(!tmp.path().join("nginx").exists());
    }

    #[tokio::test]
    async fn test_full_run() {
        let tmp = tempfile::tempdir().unwrap();
        let store: StoreHandle = Arc::new(MockStore::with_files([
            ("/home/data/osm.20240101.versatiles", b"osm-bytes".to_vec()),
            ("/home/data/satellite.versatiles", b"sat-bytes".to_vec()),
        ]));
        let config = test_config(tmp.path());
        std::fs::create_dir_all(config.content_dir()).unwrap();
        std::fs::write(config.content_dir().join("index.html"), "<html></html>").unwrap();

        run(&config, &store).await.unwrap();

        // The mirror-flagged osm group was fetched locally.
        assert!(config.tiles_dir().join("osm.20240101.versatiles").exists());
        assert!(!config.tiles_dir().join("satellite.versatiles").exists());

        let conf = std::fs::read_to_string(config.nginx_dir().join("download.conf")).unwrap();
        // Local mirror route, date-stripped latest route and content page.
        assert!(conf.contains("location = /osm.versatiles"));
        assert!(conf.contains("location = /index.html"));
        // Satellite stayed remote and is proxied.
        assert!(conf.contains("proxy_pass https://storage.example.org/webdav/data/satellite.versatiles;"));
        // Checksum stubs and the url-list manifest made it in.
        assert!(conf.contains("location = /osm.versatiles.md5"));
        assert!(conf.contains("location = /satellite.versatiles.sha256"));
        assert!(conf.contains("location = /urllist_osm.tsv"));
        assert!(conf.contains("TsvHttpData-1.0"));
        assert!(conf.contains("https://download.example.org/osm.versatiles"));
    }

    #[tokio::test]
    async fn test_second_run_reuses_cache_and_mirror() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockStore::with_files([(
            "/home/data/osm.20240101.versatiles",
            b"osm-bytes".to_vec(),
        )]));
        let store: StoreHandle = mock.clone();
        let config = test_config(tmp.path());

        run(&config, &store).await.unwrap();
        let hashes_after_first = mock.hash_computations();
        let fetches_after_first = mock.fetches();

        run(&config, &store).await.unwrap();
        assert_eq!(mock.hash_computations(), hashes_after_first);
        assert_eq!(mock.fetches(), fetches_after_first);
    }
}
