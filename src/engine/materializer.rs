// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Writes a parsed manifest as menu rows.
//!
//! Nodes are inserted depth-first, pre-order, left-to-right. Each row takes
//! the next value of a running `order` counter, so display order can be
//! derived by sorting on `order` alone, at any depth.

use tracing::debug;

use crate::error::{MenuSyncError, StoreResultExt};
use crate::manifest::{NavManifest, NavNode};
use crate::path_resolver::MenuPathResolver;
use crate::storage::traits::{MenuId, MenuTransaction, NewMenuRecord, StorageError, StoreOp};

/// Icon given to every generated menu entry.
pub const MENU_ICON: &str = "fa-file-o";

/// First `order` value for a pass, given the current maximum. `None` when
/// the maximum is already `i64::MAX`.
pub(super) fn first_order(max_order: Option<i64>) -> Option<i64> {
    max_order.map_or(Some(1), |max| max.max(0).checked_add(1))
}

/// The `order` column has no room left for another row.
pub(super) fn order_exhausted() -> MenuSyncError {
    MenuSyncError::storage(
        StoreOp::MaxOrder,
        StorageError::Backend("menu order range exhausted".to_string()),
    )
}

/// Insert one row per manifest node and return the new ids in traversal order.
///
/// Stops at the first failed insert; the caller's transaction discards the
/// rows written so far.
pub(super) async fn materialize(
    tx: &mut dyn MenuTransaction,
    resolver: &MenuPathResolver,
    root_key: &str,
    manifest: &NavManifest,
    first_order: i64,
) -> Result<Vec<MenuId>, MenuSyncError> {
    let entries = manifest.flatten();
    let mut ids: Vec<MenuId> = Vec::with_capacity(entries.len());

    for (offset, entry) in entries.iter().enumerate() {
        let order = i64::try_from(offset)
            .ok()
            .and_then(|offset| first_order.checked_add(offset))
            .ok_or_else(order_exhausted)?;
        // Pre-order guarantees the parent was inserted first
        let parent_id = entry.parent.map_or(0, |index| ids[index]);
        let uri = match entry.node {
            NavNode::Leaf { target_path, .. } => resolver.resolve(root_key, target_path),
            NavNode::Branch { .. } => String::new(),
        };

        let record = NewMenuRecord {
            icon: MENU_ICON.to_string(),
            title: entry.node.label().to_string(),
            uri,
            parent_id,
            order,
        };
        let id = tx.insert_menu(&record).await.during(StoreOp::InsertMenu)?;
        debug!(id, parent_id, order, title = %record.title, "Menu inserted");

        ids.push(id);
    }

    Ok(ids)
}
