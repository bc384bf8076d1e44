use crate::error::{MenuSyncError, StoreResultExt};
use crate::storage::traits::StoreOp;
use crate::sync_record::{decode_ids, menu_ids_key};

use super::{MenuEntry, MenuSynchronizer};

impl MenuSynchronizer {
    /// First node of the root's last sync, `None` if it was never synced or
    /// the recorded rows are gone.
    ///
    /// Ids are recorded in insertion order, so the first id is also the
    /// lowest `order`.
    pub async fn first_menu(&self, root_key: &str) -> Result<Option<MenuEntry>, MenuSyncError> {
        let key = menu_ids_key(root_key);
        let Some(value) = self.store.get_setting(&key).await.during(StoreOp::GetSetting)? else {
            return Ok(None);
        };

        let ids = decode_ids(&value).map_err(|segment| MenuSyncError::MalformedSyncRecord { key, segment })?;
        let Some(&first) = ids.first() else {
            return Ok(None);
        };

        let menu = self.store.find_menu(first).await.during(StoreOp::FindMenu)?;
        Ok(menu.map(|record| MenuEntry {
            label: record.title,
            uri: record.uri,
        }))
    }
}
