// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Menu row id as assigned by the store on insert.
pub type MenuId = i64;

/// Role id from the admin panel's permission system.
pub type RoleId = i64;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Record not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Injected failure on {0}")]
    Injected(StoreOp),
}

/// Storage operations, used to label failures in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StoreOp {
    Connect,
    Begin,
    Commit,
    GetSetting,
    UpsertSetting,
    MaxOrder,
    FindMenu,
    InsertMenu,
    DeleteMenus,
    InsertRoleGrant,
    DeleteRoleGrants,
}

impl StoreOp {
    /// Whether the operation only reads.
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, Self::Connect | Self::GetSetting | Self::MaxOrder | Self::FindMenu)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::GetSetting => "get_setting",
            Self::UpsertSetting => "upsert_setting",
            Self::MaxOrder => "max_order",
            Self::FindMenu => "find_menu",
            Self::InsertMenu => "insert_menu",
            Self::DeleteMenus => "delete_menus",
            Self::InsertRoleGrant => "insert_role_grant",
            Self::DeleteRoleGrants => "delete_role_grants",
        }
    }
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted menu row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuRecord {
    pub id: MenuId,
    pub icon: String,
    pub title: String,
    pub uri: String,
    /// `0` for top-level entries
    pub parent_id: MenuId,
    pub order: i64,
}

/// A menu row about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenuRecord {
    pub icon: String,
    pub title: String,
    pub uri: String,
    pub parent_id: MenuId,
    pub order: i64,
}

impl NewMenuRecord {
    pub(crate) fn into_record(self, id: MenuId) -> MenuRecord {
        MenuRecord {
            id,
            icon: self.icon,
            title: self.title,
            uri: self.uri,
            parent_id: self.parent_id,
            order: self.order,
        }
    }
}

/// Entry point to the admin panel's menu tables.
///
/// Reads may be issued directly against the store. All writes go through a
/// [`MenuTransaction`] obtained from [`begin`](Self::begin), so that one
/// root's delete, insert and bookkeeping steps land together or not at all.
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Highest `order` across all menu rows, `None` when the table is empty.
    async fn max_order(&self) -> Result<Option<i64>, StorageError>;

    async fn find_menu(&self, id: MenuId) -> Result<Option<MenuRecord>, StorageError>;

    async fn begin(&self) -> Result<Box<dyn MenuTransaction>, StorageError>;
}

/// A unit of work against the menu tables.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// every write made through it.
#[async_trait]
pub trait MenuTransaction: Send {
    async fn get_setting(&mut self, key: &str) -> Result<Option<String>, StorageError>;

    /// Read a setting and block other transactions from deciding on it
    /// until this one ends. A transaction that waited sees the value the
    /// winner committed.
    async fn get_setting_for_update(&mut self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert the key, or overwrite its value if it already exists.
    async fn upsert_setting(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn max_order(&mut self) -> Result<Option<i64>, StorageError>;

    async fn insert_menu(&mut self, record: &NewMenuRecord) -> Result<MenuId, StorageError>;

    /// Delete menu rows by id. Unknown ids are ignored.
    async fn delete_menus(&mut self, ids: &[MenuId]) -> Result<u64, StorageError>;

    async fn insert_role_grant(&mut self, menu_id: MenuId, role_id: RoleId) -> Result<(), StorageError>;

    /// Delete every role grant referencing one of `menu_ids`.
    async fn delete_role_grants(&mut self, menu_ids: &[MenuId]) -> Result<u64, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
