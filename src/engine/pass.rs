// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Synchronization pass: every root in turn, one unit of work per root.

use std::io::ErrorKind;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::{MenuSyncError, StoreResultExt};
use crate::fingerprint::{Fingerprint, SyncDecision};
use crate::manifest::NavManifest;
use crate::root::NavigationRoot;
use crate::storage::traits::{MenuId, MenuTransaction, StoreOp};
use crate::sync_record::{decode_ids, encode_ids, menu_ids_key, menu_nav_key};

use super::grants::grant_role;
use super::materializer::{first_order, materialize, order_exhausted};
use super::reconciler::clear_stale;
use super::{MenuSynchronizer, RootOutcome, RootReport, SyncReport};

/// Bookkeeping of a root as last recorded.
struct PriorSync {
    ids: Option<String>,
    fingerprint: Option<String>,
}

impl PriorSync {
    fn decide(&self, current: &Fingerprint) -> SyncDecision {
        SyncDecision::decide(self.ids.is_some(), self.fingerprint.as_deref(), current)
    }

    fn previous_ids(&self, root_key: &str) -> Result<Vec<MenuId>, MenuSyncError> {
        match &self.ids {
            Some(value) => decode_ids(value).map_err(|segment| MenuSyncError::MalformedSyncRecord {
                key: menu_ids_key(root_key),
                segment,
            }),
            None => Ok(Vec::new()),
        }
    }
}

impl MenuSynchronizer {
    /// Synchronize every root, in ascending key order.
    ///
    /// A failing root is logged and reported, and the pass moves on to the
    /// next one. Only fatal errors (see [`MenuSyncError::is_fatal`]) end the
    /// pass early and are returned.
    #[tracing::instrument(skip(self), fields(roots = self.roots.len()))]
    pub async fn sync_all(&self) -> Result<SyncReport, MenuSyncError> {
        if !self.build_menu {
            info!("Menu build disabled - skipping synchronization");
            return Ok(SyncReport::disabled());
        }

        let pass_start = Instant::now();
        info!("Starting menu synchronization pass...");

        let mut report = SyncReport::default();
        for root in self.roots.iter() {
            let outcome = match self.sync_navigation_root(root).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    error!(root = %root.key, error = %e, "Menu synchronization aborted");
                    crate::metrics::record_error(&root.key, e.kind());
                    crate::metrics::record_pass_latency(pass_start.elapsed());
                    return Err(e);
                }
                Err(e) => {
                    match &e {
                        MenuSyncError::MalformedManifest { .. } | MenuSyncError::ManifestUnreadable { .. } => {
                            warn!(root = %root.key, error = %e, "Skipping root with unusable manifest");
                        }
                        _ => error!(root = %root.key, error = %e, "Menu synchronization failed for root"),
                    }
                    crate::metrics::record_error(&root.key, e.kind());
                    RootOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };

            crate::metrics::record_root_outcome(&root.key, outcome.label());
            report.roots.push(RootReport {
                key: root.key.clone(),
                outcome,
            });
        }

        crate::metrics::record_pass_latency(pass_start.elapsed());
        info!(
            roots = report.roots.len(),
            failed = report.failed().count(),
            menus_written = report.menus_written(),
            "Menu synchronization pass complete"
        );
        Ok(report)
    }

    /// Synchronize a single root by key, regardless of `build_menu`.
    pub async fn sync_root(&self, key: &str) -> Result<RootOutcome, MenuSyncError> {
        let root = self
            .roots
            .get(key)
            .ok_or_else(|| MenuSyncError::UnknownRoot(key.to_string()))?;
        self.sync_navigation_root(root).await
    }

    #[tracing::instrument(skip(self, root), fields(root = %root.key, decision = tracing::field::Empty))]
    async fn sync_navigation_root(&self, root: &NavigationRoot) -> Result<RootOutcome, MenuSyncError> {
        let start = Instant::now();
        let result = self.run_root(root).await;
        crate::metrics::record_root_latency(&root.key, start.elapsed());

        if let Ok(outcome) = &result {
            info!(outcome = %outcome, "Root synchronized");
        }
        result
    }

    async fn run_root(&self, root: &NavigationRoot) -> Result<RootOutcome, MenuSyncError> {
        let manifest_path = root.manifest_path();
        let bytes = match tokio::fs::read(&manifest_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %manifest_path.display(), "No manifest - root has no menu");
                return Ok(RootOutcome::NoManifest);
            }
            Err(source) => {
                return Err(MenuSyncError::ManifestUnreadable {
                    path: manifest_path,
                    source,
                })
            }
        };

        let fingerprint = Fingerprint::compute(self.fingerprint, &bytes);
        let prior = PriorSync {
            ids: self.store.get_setting(&menu_ids_key(&root.key)).await.during(StoreOp::GetSetting)?,
            fingerprint: self.store.get_setting(&menu_nav_key(&root.key)).await.during(StoreOp::GetSetting)?,
        };

        let decision = prior.decide(&fingerprint);
        tracing::Span::current().record("decision", tracing::field::display(decision));
        if decision == SyncDecision::UpToDate {
            debug!(fingerprint = %fingerprint, "Manifest unchanged - skipping");
            return Ok(RootOutcome::UpToDate);
        }

        let manifest = NavManifest::parse(&bytes).map_err(|source| MenuSyncError::MalformedManifest {
            path: manifest_path.clone(),
            source,
        })?;

        let mut tx = self.store.begin().await.during(StoreOp::Begin)?;
        match self.apply(tx.as_mut(), root, &manifest, &fingerprint).await {
            Ok(Some(outcome)) => {
                tx.commit().await.during(StoreOp::Commit)?;
                Ok(outcome)
            }
            Ok(None) => {
                // Another process finished the same sync first
                rollback(tx, &root.key).await;
                Ok(RootOutcome::UpToDate)
            }
            Err(e) => {
                rollback(tx, &root.key).await;
                Err(e)
            }
        }
    }

    /// Replace the root's rows inside `tx`. `None` when the recorded sync
    /// already matches `fingerprint`.
    async fn apply(
        &self,
        tx: &mut dyn MenuTransaction,
        root: &NavigationRoot,
        manifest: &NavManifest,
        fingerprint: &Fingerprint,
    ) -> Result<Option<RootOutcome>, MenuSyncError> {
        let ids_key = menu_ids_key(&root.key);
        let nav_key = menu_nav_key(&root.key);

        // Decide again under the transaction: the first look was unguarded.
        // The locked read makes a concurrent sync of this root wait here and
        // then see this one's bookkeeping.
        let prior = PriorSync {
            ids: tx
                .get_setting_for_update(&ids_key)
                .await
                .during(StoreOp::GetSetting)?,
            fingerprint: tx.get_setting(&nav_key).await.during(StoreOp::GetSetting)?,
        };
        let decision = prior.decide(fingerprint);
        if decision == SyncDecision::UpToDate {
            return Ok(None);
        }

        let removed = match decision {
            SyncDecision::StaleSyncRequired => {
                let previous = prior.previous_ids(&root.key)?;
                let removed = clear_stale(tx, &previous).await?;
                crate::metrics::record_stale_removed(&root.key, removed.menus, removed.grants);
                Some(removed)
            }
            _ => None,
        };

        let max_order = tx.max_order().await.during(StoreOp::MaxOrder)?;
        let start_order = first_order(max_order).ok_or_else(order_exhausted)?;
        let menu_ids = materialize(tx, &self.resolver, &root.key, manifest, start_order).await?;
        crate::metrics::record_nodes_materialized(&root.key, menu_ids.len());

        tx.upsert_setting(&ids_key, &encode_ids(&menu_ids))
            .await
            .during(StoreOp::UpsertSetting)?;
        tx.upsert_setting(&nav_key, fingerprint.as_str())
            .await
            .during(StoreOp::UpsertSetting)?;

        let granted = grant_role(tx, self.grantee_role, &menu_ids).await?;
        if granted > 0 {
            crate::metrics::record_grants_written(&root.key, granted);
        }

        debug!(
            menus = menu_ids.len(),
            granted,
            first_order = start_order,
            "Root materialized"
        );

        Ok(Some(match removed {
            Some(removed) => RootOutcome::Resynced {
                removed_menus: removed.menus,
                removed_grants: removed.grants,
                menu_ids,
            },
            None => RootOutcome::Created { menu_ids },
        }))
    }
}

async fn rollback(tx: Box<dyn MenuTransaction>, root_key: &str) {
    if let Err(e) = tx.rollback().await {
        warn!(root = %root_key, error = %e, "Rollback failed - the store discards the transaction on close");
    }
}
