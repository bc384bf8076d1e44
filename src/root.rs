//! Navigation roots: independently synchronized documentation trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Key of the root created from the main `path` setting.
pub const DEFAULT_ROOT_KEY: &str = "def";

/// Manifest file name inside a root directory.
pub const MANIFEST_FILE: &str = "nav.yml";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RootError {
    #[error("root key must not be empty")]
    EmptyKey,
    #[error("root '{0}' is already registered")]
    Duplicate(String),
    #[error("root '{key}' has an empty path")]
    EmptyPath { key: String },
    #[error("root '{key}' path does not exist: {path}")]
    MissingPath { key: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRoot {
    pub key: String,
    pub base_path: PathBuf,
    pub title: String,
}

impl NavigationRoot {
    /// Create a root, checking that its directory exists.
    pub fn new(key: &str, base_path: impl Into<PathBuf>, title: &str) -> Result<Self, RootError> {
        let base_path = base_path.into();
        if key.trim().is_empty() {
            return Err(RootError::EmptyKey);
        }
        if base_path.as_os_str().is_empty() {
            return Err(RootError::EmptyPath { key: key.to_string() });
        }
        if !base_path.exists() {
            return Err(RootError::MissingPath {
                key: key.to_string(),
                path: base_path,
            });
        }
        Ok(Self {
            key: key.to_string(),
            base_path,
            title: title.to_string(),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_path.join(MANIFEST_FILE)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.key == DEFAULT_ROOT_KEY
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }
}

/// All configured roots, iterated in ascending key order.
#[derive(Debug, Clone, Default)]
pub struct Roots {
    roots: BTreeMap<String, NavigationRoot>,
}

impl Roots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, root: NavigationRoot) -> Result<(), RootError> {
        if self.roots.contains_key(&root.key) {
            return Err(RootError::Duplicate(root.key));
        }
        self.roots.insert(root.key.clone(), root);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&NavigationRoot> {
        self.roots.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NavigationRoot> {
        self.roots.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
