// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL storage backend over the admin panel's menu tables.
//!
//! Works against the three tables the admin panel already owns:
//!
//! ```sql
//! goadmin_menu      (id, parent_id, type, `order`, title, icon, uri, ...)
//! goadmin_role_menu (role_id, menu_id, ...)
//! goadmin_site      (id, `key`, value, ...)
//! ```
//!
//! Missing tables are created on connect, so a fresh SQLite file is usable
//! for tests and local runs. Existing MySQL installations keep their schema.
//!
//! ## sqlx Any Driver Quirks
//!
//! - MySQL `INT UNSIGNED` columns do not decode into `i64` through `Any`,
//!   so integer columns are cast to `SIGNED` on MySQL.
//! - `TEXT` columns may come back as BLOB on MySQL, so text is read as
//!   `String` first and as UTF-8 bytes second.
//! - `order` and `key` are reserved words; both SQLite and MySQL accept
//!   backtick quoting.
//! - `last_insert_id()` on an `Any` query result is `None` for SQLite, so
//!   new ids are read back on the same connection: `RETURNING id` on
//!   SQLite, `LAST_INSERT_ID()` on MySQL.
//!
//! ## Locking
//!
//! [`MenuTransaction::get_setting_for_update`] serializes transactions that
//! decide on the same root. On SQLite it takes the database write lock
//! with a no-op `UPDATE` before reading. On MySQL it is a
//! `SELECT ... FOR UPDATE`; `key` has no index, so InnoDB locks every
//! scanned row and gap. When two such transactions race on an empty table,
//! InnoDB aborts one of them as a deadlock instead of letting both insert.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Row, Transaction};
use tracing::{debug, info};

use super::traits::{
    MenuId, MenuRecord, MenuStore, MenuTransaction, NewMenuRecord, RoleId, StorageError,
};

pub const MENU_TABLE: &str = "goadmin_menu";
pub const ROLE_MENU_TABLE: &str = "goadmin_role_menu";
pub const SITE_TABLE: &str = "goadmin_site";

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

fn backend(context: &str, e: sqlx::Error) -> StorageError {
    StorageError::Backend(format!("{}: {}", context, e))
}

/// Read a text column as `String` (SQLite) or UTF-8 bytes (MySQL LONGTEXT).
fn text_column(row: &AnyRow, column: &str) -> Result<String, StorageError> {
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(column) {
        return Ok(s);
    }
    match row.try_get::<Option<Vec<u8>>, _>(column) {
        Ok(Some(bytes)) => String::from_utf8(bytes)
            .map_err(|e| StorageError::Backend(format!("Column {} is not UTF-8: {}", column, e))),
        Ok(None) => Ok(String::new()),
        Err(e) => Err(backend(&format!("Failed to read column {}", column), e)),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Dialect-specific SQL text.
#[derive(Debug, Clone, Copy)]
struct Dialect {
    is_sqlite: bool,
}

impl Dialect {
    /// Integer column expression that decodes into `i64` on both backends.
    fn int(self, column: &str) -> String {
        if self.is_sqlite {
            column.to_string()
        } else {
            format!("CAST({} AS SIGNED)", column)
        }
    }

    fn select_menu_by_id(self) -> String {
        format!(
            "SELECT {} AS id, icon, title, uri, {} AS parent_id, {} AS menu_order \
             FROM {} WHERE id = ?",
            self.int("id"),
            self.int("parent_id"),
            self.int("`order`"),
            MENU_TABLE
        )
    }

    fn select_setting(self, for_update: bool) -> String {
        let lock = if for_update && !self.is_sqlite { " FOR UPDATE" } else { "" };
        format!("SELECT value FROM {} WHERE `key` = ? LIMIT 1{}", SITE_TABLE, lock)
    }

    /// Statement that makes SQLite take its write lock, so the reads that
    /// follow see the last committed state and no other writer can interleave.
    fn acquire_write_lock(self) -> Option<String> {
        self.is_sqlite
            .then(|| format!("UPDATE {} SET value = value WHERE 1 = 0", SITE_TABLE))
    }

    fn insert_menu(self) -> String {
        let returning = if self.is_sqlite { " RETURNING id" } else { "" };
        format!(
            "INSERT INTO {} (icon, title, uri, parent_id, `order`) VALUES (?, ?, ?, ?, ?){}",
            MENU_TABLE, returning
        )
    }

    fn select_max_order(self) -> String {
        format!("SELECT {} AS max_order FROM {}", self.int("MAX(`order`)"), MENU_TABLE)
    }
}

async fn fetch_setting<'c, E>(executor: E, sql: &str, key: &str) -> Result<Option<String>, StorageError>
where
    E: sqlx::Executor<'c, Database = Any>,
{
    let row = sqlx::query(sql)
        .bind(key.to_string())
        .fetch_optional(executor)
        .await
        .map_err(|e| backend("Failed to read site setting", e))?;

    match row {
        Some(row) => text_column(&row, "value").map(Some),
        None => Ok(None),
    }
}

async fn fetch_max_order<'c, E>(executor: E, dialect: Dialect) -> Result<Option<i64>, StorageError>
where
    E: sqlx::Executor<'c, Database = Any>,
{
    let sql = dialect.select_max_order();
    let row = sqlx::query(&sql)
        .fetch_one(executor)
        .await
        .map_err(|e| backend("Failed to read max menu order", e))?;

    row.try_get::<Option<i64>, _>("max_order")
        .map_err(|e| backend("Failed to decode max menu order", e))
}

/// SQL-backed menu store (SQLite or MySQL).
#[derive(Clone)]
pub struct SqlMenuStore {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlMenuStore {
    /// Connect and create the menu tables if they don't exist yet.
    pub async fn connect(connection_string: &str) -> Result<Self, StorageError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection_string)
            .await
            .map_err(|e| backend("Failed to connect to SQL menu store", e))?;

        let store = Self::from_pool(pool, is_sqlite);
        store.init_schema().await?;

        info!(sqlite = is_sqlite, "SQL menu store initialized");
        Ok(store)
    }

    /// Create from an existing pool. Does not touch the schema.
    pub fn from_pool(pool: AnyPool, is_sqlite: bool) -> Self {
        Self {
            pool,
            dialect: Dialect { is_sqlite },
        }
    }

    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    /// Create the menu, role-menu and site tables if they are missing.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let sql = if self.dialect.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS goadmin_menu (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL DEFAULT 0,
                type INTEGER NOT NULL DEFAULT 0,
                `order` INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                icon TEXT NOT NULL,
                uri TEXT NOT NULL DEFAULT '',
                header TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS goadmin_role_menu (
                role_id INTEGER NOT NULL,
                menu_id INTEGER NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_role_menu_menu ON goadmin_role_menu(menu_id);
            CREATE TABLE IF NOT EXISTS goadmin_site (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                `key` TEXT,
                value TEXT,
                description TEXT,
                state INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#
        } else {
            r#"
            CREATE TABLE IF NOT EXISTS `goadmin_menu` (
                `id` INT UNSIGNED NOT NULL AUTO_INCREMENT,
                `parent_id` INT UNSIGNED NOT NULL DEFAULT 0,
                `type` TINYINT UNSIGNED NOT NULL DEFAULT 0,
                `order` INT UNSIGNED NOT NULL DEFAULT 0,
                `title` VARCHAR(50) NOT NULL,
                `icon` VARCHAR(50) NOT NULL,
                `uri` VARCHAR(3000) NOT NULL DEFAULT '',
                `header` VARCHAR(150) DEFAULT NULL,
                `created_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                `updated_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (`id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
            CREATE TABLE IF NOT EXISTS `goadmin_role_menu` (
                `role_id` INT UNSIGNED NOT NULL,
                `menu_id` INT UNSIGNED NOT NULL,
                `created_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                `updated_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                KEY `role_menu_menu_id` (`menu_id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
            CREATE TABLE IF NOT EXISTS `goadmin_site` (
                `id` INT UNSIGNED NOT NULL AUTO_INCREMENT,
                `key` VARCHAR(100) DEFAULT NULL,
                `value` LONGTEXT,
                `description` VARCHAR(3000) DEFAULT NULL,
                `state` TINYINT UNSIGNED NOT NULL DEFAULT 0,
                `created_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                `updated_at` TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (`id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
            "#
        };

        // One statement per call on both backends
        for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| backend("Failed to init menu schema", e))?;
        }

        Ok(())
    }
}

fn menu_from_row(row: &AnyRow) -> Result<MenuRecord, StorageError> {
    let int = |column: &str| {
        row.try_get::<i64, _>(column)
            .map_err(|e| backend(&format!("Failed to read column {}", column), e))
    };
    Ok(MenuRecord {
        id: int("id")?,
        icon: text_column(row, "icon")?,
        title: text_column(row, "title")?,
        uri: text_column(row, "uri")?,
        parent_id: int("parent_id")?,
        order: int("menu_order")?,
    })
}

#[async_trait]
impl MenuStore for SqlMenuStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        fetch_setting(&self.pool, &self.dialect.select_setting(false), key).await
    }

    async fn max_order(&self) -> Result<Option<i64>, StorageError> {
        fetch_max_order(&self.pool, self.dialect).await
    }

    async fn find_menu(&self, id: MenuId) -> Result<Option<MenuRecord>, StorageError> {
        let sql = self.dialect.select_menu_by_id();
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend("Failed to find menu", e))?;

        row.as_ref().map(menu_from_row).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn MenuTransaction>, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend("Failed to begin transaction", e))?;
        Ok(Box::new(SqlMenuTransaction {
            tx,
            dialect: self.dialect,
        }))
    }
}

/// A database transaction over the menu tables.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct SqlMenuTransaction {
    tx: Transaction<'static, Any>,
    dialect: Dialect,
}

#[async_trait]
impl MenuTransaction for SqlMenuTransaction {
    async fn get_setting(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        fetch_setting(&mut *self.tx, &self.dialect.select_setting(false), key).await
    }

    async fn get_setting_for_update(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        if let Some(sql) = self.dialect.acquire_write_lock() {
            sqlx::query(&sql)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| backend("Failed to lock menu tables", e))?;
        }
        fetch_setting(&mut *self.tx, &self.dialect.select_setting(true), key).await
    }

    async fn upsert_setting(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // `key` carries no unique index in the admin schema, so decide explicitly
        let exists = fetch_setting(&mut *self.tx, &self.dialect.select_setting(true), key)
            .await?
            .is_some();

        let sql = if exists {
            format!("UPDATE {} SET value = ? WHERE `key` = ?", SITE_TABLE)
        } else {
            format!("INSERT INTO {} (value, `key`) VALUES (?, ?)", SITE_TABLE)
        };

        sqlx::query(&sql)
            .bind(value.to_string())
            .bind(key.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| backend("Failed to upsert site setting", e))?;

        debug!(key = %key, updated = exists, "Site setting written");
        Ok(())
    }

    async fn max_order(&mut self) -> Result<Option<i64>, StorageError> {
        fetch_max_order(&mut *self.tx, self.dialect).await
    }

    async fn insert_menu(&mut self, record: &NewMenuRecord) -> Result<MenuId, StorageError> {
        let sql = self.dialect.insert_menu();
        let query = sqlx::query(&sql)
            .bind(record.icon.clone())
            .bind(record.title.clone())
            .bind(record.uri.clone())
            .bind(record.parent_id)
            .bind(record.order);

        let row = if self.dialect.is_sqlite {
            query
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| backend("Failed to insert menu", e))?
        } else {
            query
                .execute(&mut *self.tx)
                .await
                .map_err(|e| backend("Failed to insert menu", e))?;
            // Per-connection value, and the transaction pins the connection
            sqlx::query("SELECT CAST(LAST_INSERT_ID() AS SIGNED) AS id")
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| backend("Failed to read inserted menu id", e))?
        };

        row.try_get::<i64, _>("id")
            .map_err(|e| backend("Failed to decode inserted menu id", e))
    }

    async fn delete_menus(&mut self, ids: &[MenuId]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!("DELETE FROM {} WHERE id IN ({})", MENU_TABLE, placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| backend("Failed to delete menus", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_role_grant(&mut self, menu_id: MenuId, role_id: RoleId) -> Result<(), StorageError> {
        let sql = format!("INSERT INTO {} (menu_id, role_id) VALUES (?, ?)", ROLE_MENU_TABLE);
        sqlx::query(&sql)
            .bind(menu_id)
            .bind(role_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| backend("Failed to insert role menu", e))?;
        Ok(())
    }

    async fn delete_role_grants(&mut self, menu_ids: &[MenuId]) -> Result<u64, StorageError> {
        if menu_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "DELETE FROM {} WHERE menu_id IN ({})",
            ROLE_MENU_TABLE,
            placeholders(menu_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in menu_ids {
            query = query.bind(*id);
        }

        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| backend("Failed to delete role menus", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|e| backend("Failed to commit menu transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| backend("Failed to roll back menu transaction", e))
    }
}
