//! File cataloging and grouping engine.
//!
//! Takes the flat file list produced by the remote lister and turns it into
//! the derived catalog the web layer serves:
//!
//! - [`FileRef`] — one physical file (local or remote) with its public URL,
//!   size and integrity hashes
//! - [`HashCache`] — guarantees every file has verified md5/sha256 values,
//!   fetching or computing remotely at most once per file per run
//! - [`group_files`] — partitions files into release tracks, picks a
//!   "latest" version per track and normalises its URL
//! - [`collect_files`] / [`FileResponse`] — the deduplicated public
//!   inventory plus the synthetic checksum-stub and URL-list endpoints

pub mod error;
mod file;
mod group;
pub mod hashes;
mod registry;
mod response;

pub use crate::file::{FileRef, Hashes};
pub use crate::group::{CatalogEntry, FileGroup, collect_files, group_files, slug_of};
pub use crate::hashes::HashCache;
pub use crate::registry::{TrackInfo, UNKNOWN_ORDER, lookup_track};
pub use crate::response::{FileResponse, hex2base64url};
