//! Configuration for the `capview` binary.
//!
//! Loaded from TOML, by default at `$XDG_CONFIG_HOME/capview/config.toml`:
//!
//! ```toml
//! root = "/storage/emulated/0"
//! history = true
//!
//! [[grants]]
//! path = "/storage/emulated/0"
//! access = "read-write"
//!
//! [[grants]]
//! path = "Android"
//! access = "read-only"
//! ```
//!
//! Relative grant paths are taken relative to the root. With no grants
//! configured the whole root is granted.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use capview_kernel::{Access, LocalStore};

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Confinement root. Defaults to the current directory.
    pub root: Option<PathBuf>,
    pub grants: Vec<GrantConfig>,
    /// Persist line history between runs.
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            grants: Vec::new(),
            history: true,
        }
    }
}

/// One `[[grants]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessConfig {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl From<AccessConfig> for Access {
    fn from(access: AccessConfig) -> Self {
        match access {
            AccessConfig::ReadOnly => Access::ReadOnly,
            AccessConfig::ReadWrite => Access::ReadWrite,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The confinement root, made absolute against the current directory.
    pub fn resolved_root(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        Ok(match &self.root {
            Some(root) => cwd.join(root),
            None => cwd,
        })
    }

    /// Build a local store carrying the configured grants below `root`.
    ///
    /// Grants outside `root` are dropped. `read_only` downgrades every grant.
    pub fn build_store(&self, root: &Path, read_only: bool) -> LocalStore {
        let store = LocalStore::new();
        let clamp = |access: Access| if read_only { Access::ReadOnly } else { access };

        if self.grants.is_empty() {
            store.grants().grant(root, clamp(Access::ReadWrite));
        }
        for grant in &self.grants {
            let path = root.join(&grant.path);
            let climbs = grant.path.components().any(|c| c == Component::ParentDir);
            if climbs || !path.starts_with(root) {
                tracing::warn!(path = %path.display(), root = %root.display(), "ignoring grant outside the root");
                continue;
            }
            store.grants().grant(path, clamp(grant.access.into()));
        }
        store
    }
}

/// Default config file location.
pub fn default_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// `$XDG_CONFIG_HOME/capview`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("capview")
}

/// `$XDG_DATA_HOME/capview`, where line history lives.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
        .join("capview")
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
