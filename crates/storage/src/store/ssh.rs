//! SSH/SCP remote store.
//!
//! Drives `ssh` and `scp` subprocesses against a restricted-shell storage
//! box. The box only offers a handful of commands (`ls`, `cat`, the
//! coreutils hash tools), so listing is done by parsing `ls -lR` output
//! rather than anything structured.

use crate::error::{ErrorKind, Result};
use crate::models::{HashKind, RemoteEntry};
use crate::path::validate_name;
use crate::store::RemoteStore;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
// Mirrored tile files run into hundreds of gigabytes; give transfers room.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3600);

/// Remote store backed by `ssh`/`scp` subprocesses.
///
/// Every call is one blocking round-trip bounded by a deadline. Commands run
/// with `BatchMode=yes` so a missing or rejected key fails immediately
/// instead of prompting.
pub struct SshStore {
    /// `user@host` of the storage box
    host: String,
    port: u16,
    identity: PathBuf,
    /// Data-file extension the lister filters to (without the leading dot)
    extension: String,
    command_timeout: Duration,
    fetch_timeout: Duration,
}

impl SshStore {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        identity: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity: identity.into(),
            extension: extension.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the per-call deadline for listing, sidecar reads and hash
    /// computation.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the per-call deadline for file transfers.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    fn ssh_args(&self, remote_command: &str) -> Vec<OsString> {
        vec![
            OsString::from("-i"),
            self.identity.clone().into_os_string(),
            OsString::from("-p"),
            OsString::from(self.port.to_string()),
            OsString::from("-o"),
            OsString::from("BatchMode=yes"),
            OsString::from("-o"),
            OsString::from("StrictHostKeyChecking=accept-new"),
            OsString::from(&self.host),
            OsString::from(remote_command),
        ]
    }

    async fn run(&self, program: &str, args: Vec<OsString>, deadline: Duration, what: &str) -> Result<std::process::Output> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        tracing::debug!(program, what, "running remote command");
        let output = tokio::time::timeout(deadline, command.output())
            .await
            .map_err(|_| exn::Exn::from(ErrorKind::Timeout(what.to_string(), deadline)))?
            .map_err(ErrorKind::Io)?;
        Ok(output)
    }

    /// Runs an ssh command and returns stdout, treating a failure exit as a
    /// remote error (or `NotFound` when the shell says so).
    async fn ssh(&self, remote_command: &str, subject: &Path) -> Result<String> {
        let output = self.run("ssh", self.ssh_args(remote_command), self.command_timeout, remote_command).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such file") {
                exn::bail!(ErrorKind::NotFound(subject.to_path_buf()));
            }
            exn::bail!(ErrorKind::Remote(format!("`{remote_command}` failed ({}): {}", output.status, stderr.trim())));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RemoteStore for SshStore {
    fn name(&self) -> &str {
        &self.host
    }

    async fn list(&self, root: &Path) -> Result<Vec<RemoteEntry>> {
        tracing::info!(host = %self.host, root = %root.display(), "scanning remote storage");
        // `ls -lR` for compatibility with restricted shells (storage boxes
        // don't offer `find`).
        let output = self.ssh(&format!("ls -lR {}", shell_quote(root)), root).await?;
        let mut entries = parse_listing(&output, root, &self.extension);
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!(count = entries.len(), "found remote data files");
        Ok(entries)
    }

    async fn read_text(&self, path: &Path) -> Result<String> {
        self.ssh(&format!("cat {}", shell_quote(path)), path).await
    }

    async fn compute_hash(&self, path: &Path, kind: HashKind) -> Result<String> {
        self.ssh(&format!("{} {}", kind.command(), shell_quote(path)), path).await
    }

    async fn fetch(&self, path: &Path, dest: &Path) -> Result<()> {
        let args = vec![
            OsString::from("-i"),
            self.identity.clone().into_os_string(),
            OsString::from("-P"),
            OsString::from(self.port.to_string()),
            OsString::from("-o"),
            OsString::from("BatchMode=yes"),
            OsString::from("-o"),
            OsString::from("StrictHostKeyChecking=accept-new"),
            // The remote side of scp goes through the remote shell too.
            OsString::from(format!("{}:{}", self.host, shell_quote(path))),
            dest.as_os_str().to_os_string(),
        ];
        let output = self.run("scp", args, self.fetch_timeout, "scp").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            exn::bail!(ErrorKind::Remote(format!("scp of {} failed ({}): {}", path.display(), output.status, stderr.trim())));
        }
        Ok(())
    }
}

/// Single-quotes a path for a remote shell command line. Embedded single
/// quotes are valid in basenames and must not terminate the quoting.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Parses `ls -lR` output into remote entries.
///
/// Tracks the current directory from `"/path:"` header lines, skips `total`
/// lines and directory entries, takes the size from the fifth column and
/// the name from everything after the eighth (names may contain spaces).
/// Non-matching extensions are skipped silently; names that fail validation
/// are skipped with a warning.
pub fn parse_listing(output: &str, root: &Path, extension: &str) -> Vec<RemoteEntry> {
    let suffix = format!(".{extension}");
    let mut entries = Vec::new();
    let mut current_dir = root.to_path_buf();

    for line in output.lines() {
        if let Some(header) = line.strip_suffix(':') {
            current_dir = PathBuf::from(header);
            continue;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with("total ") || line.starts_with('d') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 9 {
            continue;
        }
        let Ok(size) = parts[4].parse::<u64>() else {
            continue;
        };
        // The name is everything from field 8 onwards, re-joined in case it
        // contains spaces.
        let name = parts[8..].join(" ");
        if !name.ends_with(&suffix) {
            continue;
        }
        match validate_name(&name) {
            Ok(_) => entries.push(RemoteEntry::new(current_dir.join(&name), name, size)),
            Err(err) => tracing::warn!(name, %err, "skipping remote entry with unusable name"),
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
/home:
total 8
drwxr-xr-x 2 user group 4096 Jan  1 00:00 osm
drwxr-xr-x 2 user group 4096 Jan  1 00:00 misc

/home/osm:
total 3000000
-rw-r--r-- 1 user group 1073741824 Jan  1 00:00 osm.20240101.versatiles
-rw-r--r-- 1 user group 2147483648 Feb  1 00:00 osm.20240201.versatiles
-rw-r--r-- 1 user group 128 Feb  1 00:00 osm.20240201.versatiles.md5
-rw-r--r-- 1 user group 512 Feb  1 00:00 notes.txt

/home/misc:
total 100
-rw-r--r-- 1 user group 4096 Mar  1 00:00 satellite beta.versatiles
";

    #[test]
    fn test_parse_listing() {
        let entries = parse_listing(LISTING, Path::new("/home"), "versatiles");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, PathBuf::from("/home/osm/osm.20240101.versatiles"));
        assert_eq!(entries[0].name, "osm.20240101.versatiles");
        assert_eq!(entries[0].size, 1073741824);
        // Sidecars and unrelated files are filtered by extension.
        assert!(entries.iter().all(|e| !e.name.ends_with(".md5")));
        assert!(entries.iter().all(|e| !e.name.ends_with(".txt")));
        // Names with spaces survive the column re-join.
        assert_eq!(entries[2].name, "satellite beta.versatiles");
        assert_eq!(entries[2].path, PathBuf::from("/home/misc/satellite beta.versatiles"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote(Path::new("/home/osm/osm.versatiles")), "'/home/osm/osm.versatiles'");
        assert_eq!(shell_quote(Path::new("/home/satellite beta.versatiles")), "'/home/satellite beta.versatiles'");
        // A quote in the basename stays inside the quoting.
        assert_eq!(shell_quote(Path::new("/home/it's.versatiles")), r"'/home/it'\''s.versatiles'");
    }

    #[test]
    fn test_parse_listing_empty_output() {
        assert!(parse_listing("", Path::new("/home"), "versatiles").is_empty());
    }

    #[test]
    fn test_parse_listing_skips_directories_and_garbage() {
        let out = "\
/home:
total 4
drwxr-xr-x 2 user group 4096 Jan  1 00:00 dir.versatiles
-rw-r--r-- 1 user group notanumber Jan  1 00:00 bad.versatiles
-rw-r--r-- 1 user group 42 Jan  1 00:00 good.versatiles
";
        let entries = parse_listing(out, Path::new("/home"), "versatiles");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "good.versatiles");
        assert_eq!(entries[0].size, 42);
    }
}
