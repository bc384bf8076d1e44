use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use super::traits::{
    MenuId, MenuRecord, MenuStore, MenuTransaction, NewMenuRecord, RoleId, StorageError, StoreOp,
};

#[derive(Debug, Clone)]
struct MemoryState {
    next_id: MenuId,
    menus: BTreeMap<MenuId, MenuRecord>,
    grants: Vec<(MenuId, RoleId)>,
    settings: BTreeMap<String, String>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            next_id: 1,
            menus: BTreeMap::new(),
            grants: Vec::new(),
            settings: BTreeMap::new(),
        }
    }
}

impl MemoryState {
    fn max_order(&self) -> Option<i64> {
        self.menus.values().map(|m| m.order).max()
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing: HashSet<StoreOp>,
    /// Menu inserts allowed per transaction before inserts start failing
    menu_inserts_before_failure: Option<usize>,
}

/// In-memory menu store.
///
/// Transactions work on a private copy of the tables and publish it on
/// commit. Only one transaction is open at a time: `begin` waits until the
/// previous one commits, rolls back or is dropped, so its copy always
/// includes the last commit. Failures can be injected per operation to
/// exercise the engine's error paths.
///
/// The `seed_*` helpers write outside of any transaction and are meant for
/// test setup while no transaction is open.
#[derive(Clone, Default)]
pub struct InMemoryMenuStore {
    state: Arc<Mutex<MemoryState>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    faults: Arc<Mutex<Faults>>,
    writes: Arc<AtomicU64>,
    commits: Arc<AtomicU64>,
}

impl InMemoryMenuStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row outside of any transaction, e.g. a menu entry owned by
    /// another part of the admin panel.
    pub fn seed_menu(&self, record: NewMenuRecord) -> MenuId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.menus.insert(id, record.into_record(id));
        id
    }

    /// Set a key-value entry outside of any transaction.
    pub fn seed_setting(&self, key: &str, value: &str) {
        self.state.lock().settings.insert(key.to_string(), value.to_string());
    }

    /// All menu rows sorted by `order`.
    #[must_use]
    pub fn menus(&self) -> Vec<MenuRecord> {
        let mut menus: Vec<_> = self.state.lock().menus.values().cloned().collect();
        menus.sort_by_key(|m| (m.order, m.id));
        menus
    }

    #[must_use]
    pub fn grants(&self) -> Vec<(MenuId, RoleId)> {
        self.state.lock().grants.clone()
    }

    #[must_use]
    pub fn setting(&self, key: &str) -> Option<String> {
        self.state.lock().settings.get(key).cloned()
    }

    /// Write operations issued through transactions, committed or not.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Make every subsequent call of `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_on(&self, op: StoreOp) {
        self.faults.lock().failing.insert(op);
    }

    /// Let `n` menu inserts succeed in each transaction, then fail the rest.
    pub fn fail_menu_inserts_after(&self, n: usize) {
        self.faults.lock().menu_inserts_before_failure = Some(n);
    }

    pub fn clear_faults(&self) {
        let mut faults = self.faults.lock();
        faults.failing.clear();
        faults.menu_inserts_before_failure = None;
    }

    fn check(&self, op: StoreOp) -> Result<(), StorageError> {
        check_fault(&self.faults, op)
    }
}

fn check_fault(faults: &Mutex<Faults>, op: StoreOp) -> Result<(), StorageError> {
    if faults.lock().failing.contains(&op) {
        return Err(StorageError::Injected(op));
    }
    Ok(())
}

#[async_trait]
impl MenuStore for InMemoryMenuStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check(StoreOp::GetSetting)?;
        Ok(self.setting(key))
    }

    async fn max_order(&self) -> Result<Option<i64>, StorageError> {
        self.check(StoreOp::MaxOrder)?;
        Ok(self.state.lock().max_order())
    }

    async fn find_menu(&self, id: MenuId) -> Result<Option<MenuRecord>, StorageError> {
        self.check(StoreOp::FindMenu)?;
        Ok(self.state.lock().menus.get(&id).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn MenuTransaction>, StorageError> {
        self.check(StoreOp::Begin)?;
        let writer = Arc::clone(&self.writer).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            staged: self.state.lock().clone(),
            store: self.clone(),
            menu_inserts: 0,
            _writer: writer,
        }))
    }
}

struct MemoryTransaction {
    staged: MemoryState,
    store: InMemoryMenuStore,
    menu_inserts: usize,
    /// Held until the transaction ends
    _writer: OwnedMutexGuard<()>,
}

impl MemoryTransaction {
    fn check(&self, op: StoreOp) -> Result<(), StorageError> {
        check_fault(&self.store.faults, op)
    }

    fn write(&self, op: StoreOp) -> Result<(), StorageError> {
        self.check(op)?;
        self.store.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MenuTransaction for MemoryTransaction {
    async fn get_setting(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        self.check(StoreOp::GetSetting)?;
        Ok(self.staged.settings.get(key).cloned())
    }

    async fn get_setting_for_update(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        // The writer lock taken in `begin` already excludes other transactions
        self.get_setting(key).await
    }

    async fn upsert_setting(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write(StoreOp::UpsertSetting)?;
        self.staged.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn max_order(&mut self) -> Result<Option<i64>, StorageError> {
        self.check(StoreOp::MaxOrder)?;
        Ok(self.staged.max_order())
    }

    async fn insert_menu(&mut self, record: &NewMenuRecord) -> Result<MenuId, StorageError> {
        let limit = self.store.faults.lock().menu_inserts_before_failure;
        if limit.is_some_and(|n| self.menu_inserts >= n) {
            return Err(StorageError::Injected(StoreOp::InsertMenu));
        }
        self.write(StoreOp::InsertMenu)?;
        self.menu_inserts += 1;

        let id = self.staged.next_id;
        self.staged.next_id += 1;
        self.staged.menus.insert(id, record.clone().into_record(id));
        Ok(id)
    }

    async fn delete_menus(&mut self, ids: &[MenuId]) -> Result<u64, StorageError> {
        self.write(StoreOp::DeleteMenus)?;
        let removed = ids
            .iter()
            .filter(|id| self.staged.menus.remove(id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn insert_role_grant(&mut self, menu_id: MenuId, role_id: RoleId) -> Result<(), StorageError> {
        self.write(StoreOp::InsertRoleGrant)?;
        self.staged.grants.push((menu_id, role_id));
        Ok(())
    }

    async fn delete_role_grants(&mut self, menu_ids: &[MenuId]) -> Result<u64, StorageError> {
        self.write(StoreOp::DeleteRoleGrants)?;
        let before = self.staged.grants.len();
        self.staged.grants.retain(|(menu_id, _)| !menu_ids.contains(menu_id));
        Ok((before - self.staged.grants.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.check(StoreOp::Commit)?;
        let MemoryTransaction {
            staged,
            store,
            _writer: writer,
            ..
        } = *self;
        *store.state.lock() = staged;
        store.commits.fetch_add(1, Ordering::SeqCst);
        drop(writer);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }
}
