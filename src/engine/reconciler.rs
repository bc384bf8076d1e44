//! Removes the rows of a root's previous sync.

use tracing::debug;

use crate::error::{MenuSyncError, StoreResultExt};
use crate::storage::traits::{MenuId, MenuTransaction, StoreOp};

/// Rows removed while clearing a stale sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct StaleRemoval {
    pub menus: u64,
    pub grants: u64,
}

/// Delete the previous sync's menu rows and every role grant pointing at them.
///
/// Both deletions finish before any replacement row is inserted.
pub(super) async fn clear_stale(
    tx: &mut dyn MenuTransaction,
    previous_ids: &[MenuId],
) -> Result<StaleRemoval, MenuSyncError> {
    if previous_ids.is_empty() {
        return Ok(StaleRemoval::default());
    }

    let menus = tx.delete_menus(previous_ids).await.during(StoreOp::DeleteMenus)?;
    let grants = tx
        .delete_role_grants(previous_ids)
        .await
        .during(StoreOp::DeleteRoleGrants)?;

    debug!(expected = previous_ids.len(), menus, grants, "Stale menu rows cleared");
    Ok(StaleRemoval { menus, grants })
}
