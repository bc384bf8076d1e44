// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Menu synchronizer.
//!
//! The [`MenuSynchronizer`] keeps the admin panel's menu tables in line with
//! the `nav.yml` manifest of every configured documentation root.
//!
//! # Per-root pipeline
//!
//! ```text
//! read nav.yml → fingerprint → decide ─ UpToDate ──────────────────────────→ done
//!                                     └ NoPriorSync / StaleSyncRequired
//!                                         → parse → begin
//!                                         → re-decide → clear stale rows
//!                                         → insert rows → bookkeeping → role grants
//!                                         → commit
//! ```
//!
//! Everything after `begin` runs in one storage transaction, so a failure
//! leaves the root exactly as the previous sync left it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use menu_sync::{LibrarianConfig, MenuSynchronizer, InMemoryMenuStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = LibrarianConfig::new("./docs");
//! let store = Arc::new(InMemoryMenuStore::new());
//! let sync = MenuSynchronizer::new(&config, store).expect("bad config");
//!
//! let report = sync.sync_all().await.expect("pass aborted");
//! assert!(report.is_success());
//! # }
//! ```

mod types;
mod pass;
mod query;
mod materializer;
mod reconciler;
mod grants;

pub use types::{RootOutcome, RootReport, SyncReport, MenuEntry};
pub use materializer::MENU_ICON;

use std::sync::Arc;

use crate::config::{ConfigError, LibrarianConfig};
use crate::error::{MenuSyncError, StoreResultExt};
use crate::fingerprint::FingerprintAlgorithm;
use crate::path_resolver::MenuPathResolver;
use crate::root::{NavigationRoot, Roots};
use crate::storage::sql::SqlMenuStore;
use crate::storage::traits::{MenuStore, RoleId, StoreOp};

/// Synchronizes documentation manifests into the menu tables.
///
/// Holds no global state: the roots, settings and store it works with are
/// all passed in at construction.
pub struct MenuSynchronizer {
    pub(super) roots: Roots,
    pub(super) resolver: MenuPathResolver,
    pub(super) grantee_role: Option<RoleId>,
    pub(super) fingerprint: FingerprintAlgorithm,
    pub(super) build_menu: bool,
    pub(super) store: Arc<dyn MenuStore>,
}

impl MenuSynchronizer {
    /// Create a synchronizer over `store`.
    ///
    /// Fails with [`MenuSyncError::ConfigInvalid`] when a root directory is
    /// missing.
    pub fn new(config: &LibrarianConfig, store: Arc<dyn MenuStore>) -> Result<Self, MenuSyncError> {
        let roots = config.build_roots()?;
        Ok(Self {
            roots,
            resolver: MenuPathResolver::new(&config.prefix),
            grantee_role: config.grantee_role(),
            fingerprint: config.fingerprint,
            build_menu: config.build_menu,
            store,
        })
    }

    /// Create a synchronizer backed by the SQL store at `config.sql_url`.
    pub async fn connect(config: &LibrarianConfig) -> Result<Self, MenuSyncError> {
        let url = config
            .sql_url
            .as_deref()
            .ok_or(ConfigError::MissingSqlUrl)?;
        let store = SqlMenuStore::connect(url).await.during(StoreOp::Connect)?;
        Self::new(config, Arc::new(store))
    }

    /// Register another documentation root.
    pub fn add_root(&mut self, root: NavigationRoot) -> Result<&mut Self, MenuSyncError> {
        self.roots.add(root).map_err(ConfigError::from)?;
        Ok(self)
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn resolver(&self) -> &MenuPathResolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn MenuStore> {
        &self.store
    }
}
