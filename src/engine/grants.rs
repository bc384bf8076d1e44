//! Grants the configured role access to newly created menu rows.

use crate::error::{MenuSyncError, StoreResultExt};
use crate::storage::traits::{MenuId, MenuTransaction, RoleId, StoreOp};

/// Returns the number of grants written; zero when no role is configured.
pub(super) async fn grant_role(
    tx: &mut dyn MenuTransaction,
    role: Option<RoleId>,
    menu_ids: &[MenuId],
) -> Result<usize, MenuSyncError> {
    let Some(role_id) = role else {
        return Ok(0);
    };

    for &menu_id in menu_ids {
        tx.insert_role_grant(menu_id, role_id)
            .await
            .during(StoreOp::InsertRoleGrant)?;
    }
    Ok(menu_ids.len())
}
