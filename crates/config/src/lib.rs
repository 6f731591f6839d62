//! Configuration loading for the catalog pipeline.
//!
//! Settings come from three layers, later layers winning: built-in
//! defaults, an optional TOML file and `TILEDEPOT_`-prefixed environment
//! variables (nested fields separated by `__`, e.g.
//! `TILEDEPOT_REMOTE__HOST`).

pub mod error;

use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "TILEDEPOT_";

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Public domain the catalog is served under, e.g. `download.example.org`
    pub domain: String,
    /// Root of the local volumes (mirror, content and generated output)
    #[serde(default = "default_volume_dir")]
    pub volume_dir: PathBuf,
    /// Data file extension, without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,
    pub remote: RemoteConfig,
}

/// Connection settings for the remote storage box.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// SSH host of the storage box
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Private key used for batch-mode SSH and SCP
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,
    /// Directory on the storage box that is listed recursively
    #[serde(default = "default_remote_root")]
    pub root: PathBuf,
    /// Timeout for short commands (listing, hashing), in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Timeout for whole-file downloads, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// WebDAV endpoint the proxy routes forward to
    pub webdav_url: String,
    /// `user:password` for the WebDAV endpoint, if it requires auth
    #[serde(default)]
    pub webdav_auth: Option<String>,
}

fn default_volume_dir() -> PathBuf {
    PathBuf::from("/volumes")
}
fn default_extension() -> String {
    "versatiles".to_string()
}
fn default_port() -> u16 {
    23
}
fn default_identity_file() -> PathBuf {
    PathBuf::from("/app/.ssh/storage")
}
fn default_remote_root() -> PathBuf {
    PathBuf::from("/home")
}
fn default_command_timeout() -> u64 {
    120
}
fn default_fetch_timeout() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: String::new(),
            volume_dir: default_volume_dir(),
            extension: default_extension(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            identity_file: default_identity_file(),
            root: default_remote_root(),
            command_timeout_secs: default_command_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            webdav_url: String::new(),
            webdav_auth: None,
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the TOML file and the
    /// environment, then validates the result.
    ///
    /// With no explicit path, the platform config directory is consulted
    /// (e.g. `~/.config/tiledepot/config.toml`); a missing file there is
    /// fine, the defaults and environment still apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match path {
            Some(path) => figment = figment.merge(Toml::file_exact(path)),
            None => {
                if let Some(path) = Self::default_path() {
                    tracing::debug!(path = %path.display(), "checking default configuration path");
                    figment = figment.merge(Toml::file(path));
                }
            },
        }
        let config: Self =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().map_err(ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        let dirs = directories::ProjectDirs::from("org", "versatiles", "tiledepot")?;
        Some(dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            exn::bail!(ErrorKind::Invalid("domain must be set".to_string()));
        }
        if self.domain.contains('/') {
            exn::bail!(ErrorKind::Invalid(format!("domain {:?} must not contain a path", self.domain)));
        }
        if self.remote.host.is_empty() {
            exn::bail!(ErrorKind::Invalid("remote.host must be set".to_string()));
        }
        if self.remote.webdav_url.is_empty() {
            exn::bail!(ErrorKind::Invalid("remote.webdav_url must be set".to_string()));
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            exn::bail!(ErrorKind::Invalid(format!("extension {:?} must be bare, without a dot", self.extension)));
        }
        Ok(())
    }

    /// `https://<domain>/`, the prefix for absolute URLs in manifests.
    pub fn base_url(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Local mirror of the latest data files.
    pub fn tiles_dir(&self) -> PathBuf {
        self.volume_dir.join("tiles")
    }

    /// Static site content served alongside the data files.
    pub fn content_dir(&self) -> PathBuf {
        self.volume_dir.join("content")
    }

    /// Where the generated web server configuration is written.
    pub fn nginx_dir(&self) -> PathBuf {
        self.volume_dir.join("nginx")
    }

    /// Persistent hash cache, mirroring the remote file tree.
    pub fn hash_cache_dir(&self) -> PathBuf {
        self.volume_dir.join("hashes")
    }
}
