//! # Menu Sync
//!
//! Keeps an admin panel's menu tables in line with the `nav.yml` manifests of
//! one or more documentation roots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Navigation Roots                        │
//! │  • "def" from the main path, plus any extra roots          │
//! │  • One nav.yml manifest per root directory                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (fingerprint vs. bookkeeping)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Menu Synchronizer                       │
//! │  • Skips roots whose manifest is unchanged                 │
//! │  • Clears the previous sync's rows and grants              │
//! │  • Inserts one row per manifest node, in display order     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (one transaction per root)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  MySQL/SQLite Menu Tables                   │
//! │  • goadmin_menu, goadmin_role_menu, goadmin_site           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use menu_sync::{LibrarianConfig, MenuSynchronizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = LibrarianConfig::new("./docs");
//!     config.prefix = "docs".into();
//!     config.menu_user_role_id = 1;
//!     config.sql_url = Some("sqlite:admin.db?mode=rwc".into());
//!
//!     let sync = MenuSynchronizer::connect(&config).await.expect("Failed to connect");
//!     let report = sync.sync_all().await.expect("Pass aborted");
//!
//!     for root in &report.roots {
//!         println!("{}: {}", root.key, root.outcome);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: The [`MenuSynchronizer`] and its per-root pipeline
//! - [`manifest`]: `nav.yml` parsing into a [`NavManifest`] tree
//! - [`fingerprint`]: Manifest digests and the skip/resync decision
//! - [`storage`]: Menu store backends (SQL, Memory)
//! - [`config`]: [`LibrarianConfig`] and root validation

pub mod config;
pub mod root;
pub mod manifest;
pub mod fingerprint;
pub mod path_resolver;
pub mod sync_record;
pub mod storage;
pub mod engine;
pub mod error;
pub mod metrics;

pub use config::{LibrarianConfig, RootConfig, ConfigError};
pub use engine::{MenuSynchronizer, RootOutcome, RootReport, SyncReport, MenuEntry};
pub use error::MenuSyncError;
pub use manifest::{NavManifest, NavNode, ManifestError};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm, SyncDecision};
pub use path_resolver::MenuPathResolver;
pub use root::{NavigationRoot, Roots, DEFAULT_ROOT_KEY};
pub use storage::traits::{MenuStore, MenuTransaction, StorageError, StoreOp, MenuRecord, NewMenuRecord, MenuId, RoleId};
pub use storage::memory::InMemoryMenuStore;
pub use storage::sql::SqlMenuStore;
