//! Configuration for the menu sync engine.
//!
//! # Example
//!
//! ```
//! use menu_sync::LibrarianConfig;
//!
//! let config = LibrarianConfig::from_yaml_str(r#"
//! path: ./docs
//! prefix: docs
//! menu_user_role_id: 1
//! roots:
//!   v2:
//!     path: ./docs-v2
//!     title: Version 2
//! "#).unwrap();
//!
//! assert_eq!(config.title, "librarian");   // default
//! assert_eq!(config.theme, "github");      // default
//! assert!(config.build_menu);              // default
//! assert_eq!(config.grantee_role(), Some(1));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::fingerprint::FingerprintAlgorithm;
use crate::root::{NavigationRoot, RootError, Roots, DEFAULT_ROOT_KEY};
use crate::storage::traits::RoleId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("documentation path is empty")]
    EmptyPath,
    #[error("no sql_url configured")]
    MissingSqlUrl,
    #[error(transparent)]
    Root(#[from] RootError),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An additional documentation root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RootConfig {
    pub path: String,
    /// Falls back to the main `title`
    #[serde(default)]
    pub title: Option<String>,
}

/// Configuration for the documentation menu.
///
/// Only `path` is required. `roots` adds further documentation trees next
/// to the default one, each synchronized on its own.
#[derive(Debug, Clone, Deserialize)]
pub struct LibrarianConfig {
    /// Directory of the default root
    #[serde(default)]
    pub path: String,

    #[serde(default = "default_title")]
    pub title: String,

    /// Theme for the rendering layer; not used by the sync itself
    #[serde(default = "default_theme")]
    pub theme: String,

    /// URL prefix the documentation is mounted under
    #[serde(default)]
    pub prefix: String,

    /// Set to false to skip menu synchronization entirely
    #[serde(default = "default_build_menu")]
    pub build_menu: bool,

    /// Role granted access to every generated menu entry (0 = none)
    #[serde(default)]
    pub menu_user_role_id: RoleId,

    #[serde(default)]
    pub roots: BTreeMap<String, RootConfig>,

    #[serde(default)]
    pub fingerprint: FingerprintAlgorithm,

    /// Connection string for the SQL store (e.g. "sqlite:menu.db" or "mysql://...")
    #[serde(default)]
    pub sql_url: Option<String>,
}

pub const DEFAULT_TITLE: &str = "librarian";
pub const DEFAULT_THEME: &str = "github";

fn default_title() -> String { DEFAULT_TITLE.to_string() }
fn default_theme() -> String { DEFAULT_THEME.to_string() }
fn default_build_menu() -> bool { true }

impl Default for LibrarianConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            title: default_title(),
            theme: default_theme(),
            prefix: String::new(),
            build_menu: default_build_menu(),
            menu_user_role_id: 0,
            roots: BTreeMap::new(),
            fingerprint: FingerprintAlgorithm::default(),
            sql_url: None,
        }
    }
}

impl LibrarianConfig {
    /// Config for a single root at `path`, everything else defaulted.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(source)?;
        config.fill_blank_defaults();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Explicitly blank title or theme behave like unset ones.
    fn fill_blank_defaults(&mut self) {
        if self.title.trim().is_empty() {
            self.title = default_title();
        }
        if self.theme.trim().is_empty() {
            self.theme = default_theme();
        }
    }

    /// Grantee role, if one is configured.
    pub fn grantee_role(&self) -> Option<RoleId> {
        (self.menu_user_role_id != 0).then_some(self.menu_user_role_id)
    }

    /// Validate every root directory and build the root set.
    pub fn build_roots(&self) -> Result<Roots, ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        let mut roots = Roots::new();
        roots.add(NavigationRoot::new(DEFAULT_ROOT_KEY, &self.path, &self.title)?)?;

        for (key, root) in &self.roots {
            let title = root.title.as_deref().unwrap_or(&self.title);
            roots.add(NavigationRoot::new(key, &root.path, title)?)?;
        }
        Ok(roots)
    }
}
