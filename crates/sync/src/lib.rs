//! Local mirror reconciliation.
//!
//! The local volume holds a subset of the catalog — typically the latest
//! file of each mirror-flagged group — for fast direct downloads. This
//! crate makes the on-disk state match the wanted set:
//!
//! - files that are no longer wanted, or whose size no longer matches, are
//!   deleted (size mismatch is staleness, not corruption: always re-fetch
//!   rather than trust partial state),
//! - wanted files already present with the right size are reused by
//!   repointing the catalog record at the local copy,
//! - everything else is fetched into a temporary name and atomically
//!   renamed into place.
//!
//! The delete pass runs strictly before the acquire pass so a wrong-sized
//! leftover can never be mistaken for a valid mirror hit.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tiledepot_catalog::{FileGroup, FileRef};
use tiledepot_storage::StoreHandle;
use tokio::fs;

/// What one reconciliation pass actually did. Useful for logging, and lets
/// callers verify idempotence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted: usize,
    pub reused: usize,
    pub fetched: usize,
}

/// Scans the mirror directory for data files, creating it if absent.
pub async fn scan_local(dir: &Path, extension: &str) -> Result<Vec<FileRef>> {
    if !fs::try_exists(dir).await.map_err(ErrorKind::Io)? {
        fs::create_dir_all(dir).await.map_err(ErrorKind::Io)?;
        return Ok(Vec::new());
    }

    let suffix = format!(".{extension}");
    let mut entries = fs::read_dir(dir).await.map_err(ErrorKind::Io)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(&suffix) {
            continue;
        }
        let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
        if !metadata.is_file() {
            continue;
        }
        files.push(FileRef::from_local_scan(entry.path(), metadata.len()).or_raise(|| ErrorKind::Catalog)?);
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Mirrors the latest file of every mirror-flagged group into the local
/// volume, deleting whatever no longer belongs there.
pub async fn mirror_groups(
    groups: &mut [FileGroup],
    local_root: &Path,
    store: &StoreHandle,
    extension: &str,
) -> Result<SyncReport> {
    let existing = scan_local(local_root, extension).await?;
    let wanted: Vec<&mut FileRef> =
        groups.iter_mut().filter(|group| group.mirror).filter_map(|group| group.latest.as_mut()).collect();
    tracing::info!(wanted = wanted.len(), existing = existing.len(), "syncing local mirror");
    reconcile(wanted, &existing, local_root, store).await
}

/// Makes `local_root` match the wanted set.
///
/// Two passes, delete strictly before acquire. Wanted files that end up on
/// disk (reused or fetched) are repointed: `full_path` moves to the local
/// copy and `is_remote` is cleared, so the web layer serves them directly.
pub async fn reconcile(
    mut wanted: Vec<&mut FileRef>,
    existing: &[FileRef],
    local_root: &Path,
    store: &StoreHandle,
) -> Result<SyncReport> {
    fs::create_dir_all(local_root).await.map_err(ErrorKind::Io)?;

    let existing_by_name: HashMap<&str, &FileRef> = existing.iter().map(|file| (file.name.as_str(), file)).collect();
    let wanted_sizes: HashMap<String, u64> = wanted.iter().map(|file| (file.name.clone(), file.size)).collect();
    let mut report = SyncReport::default();

    for file in existing {
        let stale = match wanted_sizes.get(&file.name) {
            Some(&size) => size != file.size,
            None => true,
        };
        if stale {
            tracing::info!(name = file.name, "deleting stale mirror file");
            fs::remove_file(&file.full_path).await.map_err(ErrorKind::Io)?;
            report.deleted += 1;
        }
    }

    for file in wanted.iter_mut() {
        let local_path = local_root.join(&file.name);
        // Existence is re-checked at the filesystem, not inferred from the
        // lookup: a deletion racing this reconciliation must cause a
        // re-fetch, never a dangling reference.
        let on_disk = existing_by_name.get(file.name.as_str()).is_some_and(|local| local.size == file.size)
            && fs::try_exists(&local_path).await.map_err(ErrorKind::Io)?;
        if on_disk {
            tracing::info!(name = file.name, "keeping mirror file (already up to date)");
            report.reused += 1;
        } else {
            fetch_atomically(store, file, &local_path).await?;
            report.fetched += 1;
        }
        file.full_path = local_path;
        file.is_remote = false;
    }

    Ok(report)
}

/// Fetches into `<name>.part`, then renames into place, so the final name
/// never holds a partially-written file.
async fn fetch_atomically(store: &StoreHandle, file: &FileRef, local_path: &Path) -> Result<()> {
    let remote = match &file.remote_path {
        Some(remote) => remote,
        None => exn::bail!(ErrorKind::NoRemoteLocator(file.name.clone())),
    };
    let temp = temp_path(local_path);
    tracing::info!(name = file.name, "downloading");
    if let Err(err) = store.fetch(remote, &temp).await {
        _ = fs::remove_file(&temp).await;
        return Err(err).or_raise(|| ErrorKind::Fetch(remote.clone()));
    }
    fs::rename(&temp, local_path).await.map_err(ErrorKind::Io)?;
    Ok(())
}

fn temp_path(local_path: &Path) -> PathBuf {
    let mut os = local_path.as_os_str().to_os_string();
    os.push(".part");
    PathBuf::from(os)
}
