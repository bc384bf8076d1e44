//! End-to-end tests for the menu synchronizer against the in-memory store.
//!
//! The in-memory store supports per-operation fault injection, which covers
//! the abort and rollback paths without a database.
//!
//! # Test Organization
//! - `happy_*` - first sync, idempotence, resync, multiple roots
//! - `failure_*` - malformed input, storage faults, rollback

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use menu_sync::sync_record::{menu_ids_key, menu_nav_key};
use menu_sync::{
    Fingerprint, FingerprintAlgorithm, InMemoryMenuStore, LibrarianConfig, MenuEntry, MenuId,
    MenuRecord, MenuStore, MenuSyncError, MenuSynchronizer, MenuTransaction, NavigationRoot,
    NewMenuRecord, RootOutcome, StorageError, StoreOp,
};

const SCENARIO_NAV: &str = r#"
nav:
  - A:
      - B: b.md
      - C:
          - D: d.md
"#;

const FLAT_NAV: &str = r#"
nav:
  - Home: index.md
  - FAQ: faq.md
"#;

// =============================================================================
// Helpers
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_nav(dir: &Path, yaml: &str) {
    std::fs::write(dir.join("nav.yml"), yaml).unwrap();
}

fn docs_dir(yaml: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    if let Some(yaml) = yaml {
        write_nav(dir.path(), yaml);
    }
    dir
}

fn config_for(dir: &TempDir) -> LibrarianConfig {
    let mut config = LibrarianConfig::new(dir.path().to_string_lossy());
    config.prefix = "docs".to_string();
    config
}

fn synchronizer(config: &LibrarianConfig, store: &InMemoryMenuStore) -> MenuSynchronizer {
    init_tracing();
    MenuSynchronizer::new(config, Arc::new(store.clone())).unwrap()
}

/// Store wrapper where another process records a sync of the same manifest
/// right after the engine's unguarded pre-check, before its transaction.
struct RacedStore {
    inner: InMemoryMenuStore,
    root_key: String,
    winner_ids: String,
    winner_fingerprint: String,
    raced: AtomicBool,
}

#[async_trait]
impl MenuStore for RacedStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_setting(key).await
    }

    async fn max_order(&self) -> Result<Option<i64>, StorageError> {
        self.inner.max_order().await
    }

    async fn find_menu(&self, id: MenuId) -> Result<Option<MenuRecord>, StorageError> {
        self.inner.find_menu(id).await
    }

    async fn begin(&self) -> Result<Box<dyn MenuTransaction>, StorageError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.inner.seed_setting(&menu_ids_key(&self.root_key), &self.winner_ids);
            self.inner.seed_setting(&menu_nav_key(&self.root_key), &self.winner_fingerprint);
        }
        self.inner.begin().await
    }
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[tokio::test]
async fn happy_first_sync_materializes_tree_in_order() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    let report = sync.sync_all().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.menus_written(), 4);

    let menus = store.menus();
    let titles: Vec<&str> = menus.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C", "D"]);

    let (a, b, c, d) = (&menus[0], &menus[1], &menus[2], &menus[3]);
    assert_eq!((a.order, a.parent_id, a.uri.as_str()), (1, 0, ""));
    assert_eq!((b.order, b.parent_id, b.uri.as_str()), (2, a.id, "/docs/b"));
    assert_eq!((c.order, c.parent_id, c.uri.as_str()), (3, a.id, ""));
    assert_eq!((d.order, d.parent_id, d.uri.as_str()), (4, c.id, "/docs/d"));
    assert!(menus.iter().all(|m| m.icon == "fa-file-o"));

    let ids: Vec<String> = menus.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(store.setting(&menu_ids_key("def")), Some(ids.join(",")));
    assert_eq!(store.setting(&menu_nav_key("def")).map(|fp| fp.len()), Some(32));
    assert!(store.grants().is_empty(), "no role configured");
}

#[tokio::test]
async fn happy_unchanged_manifest_is_left_alone() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    sync.sync_all().await.unwrap();
    let menus = store.menus();
    let writes = store.write_count();
    let commits = store.commit_count();

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.outcome("def"), Some(&RootOutcome::UpToDate));
    assert_eq!(store.write_count(), writes);
    assert_eq!(store.commit_count(), commits);
    assert_eq!(store.menus(), menus);
}

#[tokio::test]
async fn happy_changed_manifest_replaces_previous_rows() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let mut config = config_for(&dir);
    config.menu_user_role_id = 2;
    let sync = synchronizer(&config, &store);

    sync.sync_all().await.unwrap();
    let first_ids: Vec<i64> = store.menus().iter().map(|m| m.id).collect();
    let first_fp = store.setting(&menu_nav_key("def")).unwrap();

    write_nav(dir.path(), FLAT_NAV);
    let report = sync.sync_all().await.unwrap();

    let new_ids = match report.outcome("def") {
        Some(RootOutcome::Resynced {
            removed_menus,
            removed_grants,
            menu_ids,
        }) => {
            assert_eq!(*removed_menus, 4);
            assert_eq!(*removed_grants, 4);
            menu_ids.clone()
        }
        other => panic!("expected resync, got {:?}", other),
    };

    let menus = store.menus();
    assert_eq!(menus.iter().map(|m| m.id).collect::<Vec<_>>(), new_ids);
    assert!(new_ids.iter().all(|id| !first_ids.contains(id)));
    assert_eq!(menus.iter().map(|m| m.title.as_str()).collect::<Vec<_>>(), vec!["Home", "FAQ"]);

    let recorded = store.setting(&menu_ids_key("def")).unwrap();
    let expected: Vec<String> = new_ids.iter().map(ToString::to_string).collect();
    assert_eq!(recorded, expected.join(","));
    assert_ne!(store.setting(&menu_nav_key("def")).unwrap(), first_fp);

    // Every grant points at a live row, and every live row is granted
    let grants = store.grants();
    assert_eq!(grants.len(), new_ids.len());
    for (menu_id, role_id) in grants {
        assert_eq!(role_id, 2);
        assert!(new_ids.contains(&menu_id));
    }
}

#[tokio::test]
async fn happy_any_byte_change_triggers_resync() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);
    sync.sync_all().await.unwrap();

    // Same tree, one extra trailing newline
    write_nav(dir.path(), &format!("{}\n", FLAT_NAV));
    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Resynced { removed_menus: 2, .. })
    ));
    assert_eq!(store.menus().len(), 2);
}

#[tokio::test]
async fn happy_grants_follow_configured_role() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let mut config = config_for(&dir);
    config.menu_user_role_id = 7;
    let sync = synchronizer(&config, &store);

    sync.sync_all().await.unwrap();

    let mut granted: Vec<i64> = store.grants().iter().map(|(menu, role)| {
        assert_eq!(*role, 7);
        *menu
    }).collect();
    granted.sort_unstable();
    let mut ids: Vec<i64> = store.menus().iter().map(|m| m.id).collect();
    ids.sort_unstable();
    assert_eq!(granted, ids);
}

#[tokio::test]
async fn happy_existing_menus_push_order_start() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    store.seed_menu(NewMenuRecord {
        icon: "fa-bar-chart".to_string(),
        title: "Dashboard".to_string(),
        uri: "/".to_string(),
        parent_id: 0,
        order: 7,
    });
    let sync = synchronizer(&config_for(&dir), &store);

    sync.sync_all().await.unwrap();

    let orders: Vec<(String, i64)> = store.menus().into_iter().map(|m| (m.title, m.order)).collect();
    assert_eq!(
        orders,
        vec![("Dashboard".to_string(), 7), ("Home".to_string(), 8), ("FAQ".to_string(), 9)]
    );
}

#[tokio::test]
async fn happy_extra_root_uses_query_prefix() {
    let main = docs_dir(Some(FLAT_NAV));
    let v2 = docs_dir(Some("nav:\n  - Intro: guide/intro.md\n"));
    let store = InMemoryMenuStore::new();
    let mut config = LibrarianConfig::new(main.path().to_string_lossy());
    config.prefix = String::new();
    let mut sync = synchronizer(&config, &store);
    sync.add_root(NavigationRoot::new("v2", v2.path(), "Docs v2").unwrap()).unwrap();

    let report = sync.sync_all().await.unwrap();
    let keys: Vec<&str> = report.roots.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["def", "v2"]);

    let intro = store.menus().into_iter().find(|m| m.title == "Intro").unwrap();
    assert_eq!(intro.uri, "/guide/intro?__prefix=v2");
    assert!(store.setting(&menu_ids_key("v2")).is_some());

    let home = sync.first_menu("def").await.unwrap();
    assert_eq!(
        home,
        Some(MenuEntry {
            label: "Home".to_string(),
            uri: "/index".to_string()
        })
    );
}

#[tokio::test]
async fn happy_first_menu_reports_root_entry() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    assert_eq!(sync.first_menu("def").await.unwrap(), None);

    sync.sync_all().await.unwrap();
    let entry = sync.first_menu("def").await.unwrap().unwrap();
    assert_eq!(entry.label, "A");
    assert_eq!(entry.uri, "");
}

#[tokio::test]
async fn happy_missing_manifest_skips_root() {
    let dir = docs_dir(None);
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.outcome("def"), Some(&RootOutcome::NoManifest));
    assert!(report.is_success());
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.setting(&menu_ids_key("def")), None);
}

#[tokio::test]
async fn happy_empty_manifest_still_records_sync() {
    let dir = docs_dir(Some("nav: []\n"));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.outcome("def"), Some(&RootOutcome::Created { menu_ids: vec![] }));
    assert_eq!(store.setting(&menu_ids_key("def")), Some(String::new()));

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.outcome("def"), Some(&RootOutcome::UpToDate));
}

#[tokio::test]
async fn happy_disabled_build_does_nothing() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let mut config = config_for(&dir);
    config.build_menu = false;
    let sync = synchronizer(&config, &store);

    let report = sync.sync_all().await.unwrap();
    assert!(report.disabled);
    assert!(report.roots.is_empty());
    assert_eq!(store.write_count(), 0);
    assert!(store.menus().is_empty());
}

#[tokio::test]
async fn happy_sync_root_targets_one_root() {
    let main = docs_dir(Some(FLAT_NAV));
    let v2 = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let mut sync = synchronizer(&config_for(&main), &store);
    sync.add_root(NavigationRoot::new("v2", v2.path(), "v2").unwrap()).unwrap();

    let outcome = sync.sync_root("v2").await.unwrap();
    assert_eq!(outcome.menu_ids().len(), 4);
    assert_eq!(store.setting(&menu_ids_key("def")), None);

    assert!(matches!(
        sync.sync_root("v3").await,
        Err(MenuSyncError::UnknownRoot(key)) if key == "v3"
    ));
}

#[test]
fn happy_pass_emits_metrics() {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(sync.sync_all()).unwrap();
    });

    let materialized: u64 = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| key.key().name() == "menu_sync_nodes_materialized_total")
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(n) => n,
            _ => 0,
        })
        .sum();
    assert_eq!(materialized, 4);
}

#[tokio::test]
async fn happy_losing_a_race_rolls_back_and_skips() {
    let dir = docs_dir(Some(FLAT_NAV));
    let inner = InMemoryMenuStore::new();
    let store = Arc::new(RacedStore {
        inner: inner.clone(),
        root_key: "def".to_string(),
        winner_ids: "900,901".to_string(),
        winner_fingerprint: Fingerprint::compute(FingerprintAlgorithm::Md5, FLAT_NAV.as_bytes())
            .to_string(),
        raced: AtomicBool::new(false),
    });
    init_tracing();
    let sync = MenuSynchronizer::new(&config_for(&dir), store).unwrap();

    let report = sync.sync_all().await.unwrap();
    assert_eq!(report.outcome("def"), Some(&RootOutcome::UpToDate));

    // Nothing of this process's attempt was kept
    assert!(inner.menus().is_empty());
    assert_eq!(inner.commit_count(), 0);
    assert_eq!(inner.setting(&menu_ids_key("def")).as_deref(), Some("900,901"));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[tokio::test]
async fn failure_malformed_manifest_only_fails_its_root() {
    let main = docs_dir(Some("nav:\n  - Home: [\n"));
    let v2 = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    let mut sync = synchronizer(&config_for(&main), &store);
    sync.add_root(NavigationRoot::new("v2", v2.path(), "v2").unwrap()).unwrap();

    let report = sync.sync_all().await.unwrap();
    assert!(!report.is_success());
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "malformed_manifest", .. })
    ));
    assert!(matches!(report.outcome("v2"), Some(RootOutcome::Created { .. })));
    assert_eq!(store.setting(&menu_ids_key("def")), None);
}

#[tokio::test]
async fn failure_too_deep_manifest_is_rejected() {
    let yaml = r#"
nav:
  - L1:
      - L2:
          - L3:
              - L4: deep.md
"#;
    let dir = docs_dir(Some(yaml));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);

    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "malformed_manifest", .. })
    ));
    assert!(store.menus().is_empty());
}

#[tokio::test]
async fn failure_max_order_read_aborts_pass() {
    let main = docs_dir(Some(FLAT_NAV));
    let v2 = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    let mut sync = synchronizer(&config_for(&main), &store);
    sync.add_root(NavigationRoot::new("v2", v2.path(), "v2").unwrap()).unwrap();
    store.fail_on(StoreOp::MaxOrder);

    let err = sync.sync_all().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        MenuSyncError::StorageQueryFailed { op: StoreOp::MaxOrder, .. }
    ));
    assert!(store.menus().is_empty());
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn failure_order_range_exhausted_aborts_pass() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    store.seed_menu(NewMenuRecord {
        icon: "fa-bar-chart".to_string(),
        title: "Dashboard".to_string(),
        uri: "/".to_string(),
        parent_id: 0,
        order: i64::MAX,
    });
    let sync = synchronizer(&config_for(&dir), &store);

    let err = sync.sync_all().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        MenuSyncError::StorageQueryFailed { op: StoreOp::MaxOrder, .. }
    ));
    assert_eq!(store.menus().len(), 1);
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn failure_insert_midway_keeps_previous_sync() {
    let dir = docs_dir(Some(SCENARIO_NAV));
    let store = InMemoryMenuStore::new();
    let mut config = config_for(&dir);
    config.menu_user_role_id = 1;
    let sync = synchronizer(&config, &store);

    sync.sync_all().await.unwrap();
    let menus = store.menus();
    let grants = store.grants();
    let ids = store.setting(&menu_ids_key("def"));
    let fp = store.setting(&menu_nav_key("def"));

    write_nav(dir.path(), FLAT_NAV);
    store.fail_menu_inserts_after(1);
    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "storage_write_failed", .. })
    ));

    // Stale rows were deleted inside the failed transaction; none of it stuck
    assert_eq!(store.menus(), menus);
    assert_eq!(store.grants(), grants);
    assert_eq!(store.setting(&menu_ids_key("def")), ids);
    assert_eq!(store.setting(&menu_nav_key("def")), fp);

    store.clear_faults();
    let report = sync.sync_all().await.unwrap();
    assert!(matches!(report.outcome("def"), Some(RootOutcome::Resynced { .. })));
    assert_eq!(store.menus().len(), 2);
}

#[tokio::test]
async fn failure_settings_read_fails_root_only() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);
    store.fail_on(StoreOp::GetSetting);

    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "storage_query_failed", .. })
    ));
}

#[tokio::test]
async fn failure_corrupt_id_list_is_reported() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    store.seed_setting(&menu_ids_key("def"), "4,five,6");
    store.seed_setting(&menu_nav_key("def"), "0123456789abcdef0123456789abcdef");
    let sync = synchronizer(&config_for(&dir), &store);

    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "malformed_sync_record", .. })
    ));
    assert!(store.menus().is_empty());
    assert_eq!(store.setting(&menu_ids_key("def")).as_deref(), Some("4,five,6"));
}

#[tokio::test]
async fn failure_commit_error_leaves_store_untouched() {
    let dir = docs_dir(Some(FLAT_NAV));
    let store = InMemoryMenuStore::new();
    let sync = synchronizer(&config_for(&dir), &store);
    store.fail_on(StoreOp::Commit);

    let report = sync.sync_all().await.unwrap();
    assert!(matches!(
        report.outcome("def"),
        Some(RootOutcome::Failed { kind: "storage_write_failed", .. })
    ));
    assert!(store.menus().is_empty());
    assert_eq!(store.setting(&menu_ids_key("def")), None);
}
