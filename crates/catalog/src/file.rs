//! The `FileRef` value type.
//!
//! One `FileRef` describes a single physical file in the catalog — either
//! still on remote storage (served via the WebDAV proxy) or mirrored to a
//! local volume (served directly). The overloaded-constructor shape of the
//! previous generation became explicit named constructors here; every
//! call-site says which lifecycle it is in.

use crate::error::{ErrorKind, Result};
use crate::response::FileResponse;
use std::path::{Path, PathBuf};
use tiledepot_storage::{HashKind, RemoteEntry};

/// Verified integrity hashes, absent until the hash cache populates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashes {
    pub md5: String,
    pub sha256: String,
}

/// A single file that is part of the download catalog.
///
/// Tracks:
/// - `full_path`: locator usable by the storage layer — a local absolute
///   path once mirrored, or the remote-storage path before that
/// - `name`: basename used for grouping, slug derivation and checksum-file
///   naming
/// - `url`: the absolute HTTP path the file is served under (exactly one
///   leading '/')
/// - `size`: authoritative byte size used for mirror reconciliation
/// - `is_remote`: whether bytes currently live only on remote storage
/// - `remote_path`: origin locator for proxy routes and fetch commands
/// - `hashes`: md5/sha256, populated by the hash cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub full_path: PathBuf,
    pub name: String,
    pub url: String,
    pub size: u64,
    pub is_remote: bool,
    pub remote_path: Option<PathBuf>,
    pub hashes: Option<Hashes>,
}

impl FileRef {
    /// A file discovered by the remote lister. Served via proxy until the
    /// mirror sync repoints it.
    pub fn from_remote_listing(entry: &RemoteEntry) -> Result<Self> {
        let url = format!("/{}", entry.name);
        validate_url(&url)?;
        Ok(Self {
            full_path: entry.path.clone(),
            name: entry.name.clone(),
            url,
            size: entry.size,
            is_remote: true,
            remote_path: Some(entry.path.clone()),
            hashes: None,
        })
    }

    /// A file found on the local disk, served at `/<basename>`.
    pub fn from_local_scan(path: impl Into<PathBuf>, size: u64) -> Result<Self> {
        let path = path.into();
        let name = basename(&path)?;
        let url = format!("/{name}");
        validate_url(&url)?;
        Ok(Self {
            full_path: path,
            name,
            url,
            size,
            is_remote: false,
            remote_path: None,
            hashes: None,
        })
    }

    /// A local file served at an explicit URL (generated content pages).
    pub fn from_local_scan_with_url(path: impl Into<PathBuf>, size: u64, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;
        let path = path.into();
        let name = basename(&path)?;
        Ok(Self {
            full_path: path,
            name,
            url,
            size,
            is_remote: false,
            remote_path: None,
            hashes: None,
        })
    }

    /// Human-readable size in binary gigabytes, one decimal place.
    ///
    /// Always derived from `size`; never stored, so it cannot drift.
    pub fn size_label(&self) -> String {
        format!("{:.1} GB", self.size as f64 / (1u64 << 30) as f64)
    }

    /// The MD5 hash of the file. Fails fast if the hash cache has not run.
    pub fn md5(&self) -> Result<&str> {
        match &self.hashes {
            Some(hashes) => Ok(&hashes.md5),
            None => exn::bail!(ErrorKind::MissingHash(self.name.clone(), HashKind::Md5)),
        }
    }

    /// The SHA256 hash of the file. Fails fast if the hash cache has not run.
    pub fn sha256(&self) -> Result<&str> {
        match &self.hashes {
            Some(hashes) => Ok(&hashes.sha256),
            None => exn::bail!(ErrorKind::MissingHash(self.name.clone(), HashKind::Sha256)),
        }
    }

    /// Builds the virtual `.md5` checksum stub for this file.
    pub fn md5_stub(&self) -> Result<FileResponse> {
        FileResponse::new(format!("{}.md5", self.url), format!("{} {}\n", self.md5()?, url_basename(&self.url)))
    }

    /// Builds the virtual `.sha256` checksum stub for this file.
    pub fn sha256_stub(&self) -> Result<FileResponse> {
        FileResponse::new(format!("{}.sha256", self.url), format!("{} {}\n", self.sha256()?, url_basename(&self.url)))
    }

    /// The path used to build this file's WebDAV proxy route: the remote
    /// locator with the storage root stripped. `None` for local-origin files.
    pub fn proxy_path(&self, remote_root: &Path) -> Option<PathBuf> {
        let remote = self.remote_path.as_ref()?;
        remote.strip_prefix(remote_root).ok().map(|rel| Path::new("/").join(rel))
    }
}

fn basename(path: &Path) -> Result<String> {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => Ok(name.to_string()),
        None => exn::bail!(ErrorKind::InvalidUrl(path.display().to_string())),
    }
}

fn url_basename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Public URLs must start with exactly one path separator, not two.
fn validate_url(url: &str) -> Result<()> {
    let mut chars = url.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), Some(c)) if c != '/' => Ok(()),
        _ => exn::bail!(ErrorKind::InvalidUrl(url.to_string())),
    }
}
