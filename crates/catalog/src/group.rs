//! The grouping engine.
//!
//! Partitions a flat list of [`FileRef`]s into release-track groups, assigns
//! registry metadata, promotes the newest file of each group to its
//! version-agnostic "latest" slot and flattens the final public inventory.

use crate::file::FileRef;
use crate::registry::{UNKNOWN_ORDER, lookup_track};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// A literal 8-digit run delimited by dots on both sides (`.YYYYMMDD.`).
/// Only the first occurrence is stripped; filenames with two such tokens or
/// a non-date 8-digit run are an upstream naming problem, not ours.
static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\d{8}\.").expect("valid regex literal"));

/// A logical group of related files — typically different versions of the
/// same dataset.
///
/// `older` holds all discovered versions, newest first. `latest` is a copy
/// of the newest version with its URL normalised; the dated original stays
/// in `older` so previous versions remain reachable. Groups for undated
/// files keep the file only in `latest`.
#[derive(Debug, Clone)]
pub struct FileGroup {
    /// Machine-readable identifier, derived from the file basename
    pub slug: String,
    /// Human-readable title shown in the download listing
    pub title: String,
    /// HTML description, fragments joined with `<br>`
    pub description: String,
    /// Sort order in the listing; lower values appear first
    pub order: u32,
    /// Whether the latest file should be mirrored to the local volume
    pub mirror: bool,
    /// The current default file, set during grouping
    pub latest: Option<FileRef>,
    /// All available versions, sorted newest to oldest
    pub older: Vec<FileRef>,
}

impl FileGroup {
    /// Builds an empty group for a slug, resolving metadata from the track
    /// registry. Unknown slugs get placeholder metadata and a warning —
    /// never an error, so one stray upload cannot take the listing down.
    fn for_slug(slug: &str) -> Self {
        match lookup_track(slug) {
            Some(track) => Self {
                slug: slug.to_string(),
                title: track.title.to_string(),
                description: track.description.join("<br>"),
                order: track.order,
                mirror: track.mirror,
                latest: None,
                older: Vec::new(),
            },
            None => {
                tracing::warn!(slug, "unknown group");
                Self {
                    slug: slug.to_string(),
                    title: "???".to_string(),
                    description: String::new(),
                    order: UNKNOWN_ORDER,
                    mirror: false,
                    latest: None,
                    older: Vec::new(),
                }
            },
        }
    }
}

/// Derives the group slug from a file basename: everything before the
/// first '.'.
pub fn slug_of(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// The decision taken when promoting a group's newest file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Promotion {
    /// The filename carries a date token; the latest URL drops it and the
    /// dated original stays in the version history.
    Dated { stripped_url: String },
    /// No date token: a single undated artifact. It exists only as
    /// `latest`, never in `older`.
    SoleArtifact,
}

fn promotion_for(url: &str) -> Promotion {
    match DATE_TOKEN.replace(url, ".") {
        Cow::Owned(stripped_url) => Promotion::Dated { stripped_url },
        Cow::Borrowed(_) => Promotion::SoleArtifact,
    }
}

/// Groups a flat list of files into release-track groups.
///
/// - The slug is the basename up to the first '.'.
/// - Known slugs get registry metadata; unknown slugs get placeholders and
///   a logged warning, and processing continues.
/// - Within a group, files sort by name descending (dates embedded as
///   zero-padded `YYYYMMDD` make this newest-first).
/// - The newest file is cloned into `latest`; a `.YYYYMMDD.` token is
///   removed from the clone's URL, or — when there is none — the file is
///   removed from `older` so it appears only as `latest`.
/// - Groups are sorted by `order`, insertion order preserved on ties.
pub fn group_files(files: Vec<FileRef>) -> Vec<FileGroup> {
    let mut groups: Vec<FileGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        let slug = slug_of(&file.name).to_string();
        let position = *index.entry(slug.clone()).or_insert_with(|| {
            groups.push(FileGroup::for_slug(&slug));
            groups.len() - 1
        });
        groups[position].older.push(file);
    }

    // Stable sort: unknown groups share the sentinel order and keep their
    // insertion order.
    groups.sort_by_key(|group| group.order);

    for group in &mut groups {
        group.older.sort_by(|a, b| b.name.cmp(&a.name));
        let mut latest = group.older[0].clone();
        match promotion_for(&latest.url) {
            Promotion::Dated { stripped_url } => latest.url = stripped_url,
            Promotion::SoleArtifact => {
                group.older.remove(0);
            },
        }
        group.latest = Some(latest);
    }

    groups
}

/// One input to [`collect_files`]: a group, a single file, or a batch of
/// either. The closed enum replaces the previous generation's runtime
/// shape check — unsupported inputs don't typecheck.
pub enum CatalogEntry {
    File(FileRef),
    Files(Vec<FileRef>),
    Group(FileGroup),
    Groups(Vec<FileGroup>),
}
impl From<FileRef> for CatalogEntry {
    fn from(file: FileRef) -> Self {
        Self::File(file)
    }
}
impl From<Vec<FileRef>> for CatalogEntry {
    fn from(files: Vec<FileRef>) -> Self {
        Self::Files(files)
    }
}
impl From<FileGroup> for CatalogEntry {
    fn from(group: FileGroup) -> Self {
        Self::Group(group)
    }
}
impl From<Vec<FileGroup>> for CatalogEntry {
    fn from(groups: Vec<FileGroup>) -> Self {
        Self::Groups(groups)
    }
}

/// Flattens groups and individual files into the final public inventory,
/// deduplicated by URL. First occurrence wins.
pub fn collect_files(entries: impl IntoIterator<Item = CatalogEntry>) -> Vec<FileRef> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected: Vec<FileRef> = Vec::new();

    let mut add_file = |file: FileRef| {
        if seen.insert(file.url.clone()) {
            collected.push(file);
        }
    };
    let add_group = |group: FileGroup, add_file: &mut dyn FnMut(FileRef)| {
        for file in group.older {
            add_file(file);
        }
        if let Some(latest) = group.latest {
            add_file(latest);
        }
    };

    for entry in entries {
        match entry {
            CatalogEntry::File(file) => add_file(file),
            CatalogEntry::Files(files) => files.into_iter().for_each(&mut add_file),
            CatalogEntry::Group(group) => add_group(group, &mut add_file),
            CatalogEntry::Groups(groups) => {
                for group in groups {
                    add_group(group, &mut add_file);
                }
            },
        }
    }
    collected
}
