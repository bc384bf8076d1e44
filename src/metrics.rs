// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the menu sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `menu_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `root`: navigation root key
//! - `outcome`: skipped, up_to_date, created, resynced, failed
//! - `kind`: error kind (see `MenuSyncError::kind`)

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome of one root in a pass
pub fn record_root_outcome(root: &str, outcome: &str) {
    counter!(
        "menu_sync_roots_total",
        "root" => root.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record menu rows written for a root
pub fn record_nodes_materialized(root: &str, count: usize) {
    counter!(
        "menu_sync_nodes_materialized_total",
        "root" => root.to_string()
    )
    .increment(count as u64);
}

/// Record rows from an earlier sync that were removed
pub fn record_stale_removed(root: &str, menus: u64, grants: u64) {
    counter!("menu_sync_stale_menus_removed_total", "root" => root.to_string()).increment(menus);
    counter!("menu_sync_stale_grants_removed_total", "root" => root.to_string()).increment(grants);
}

/// Record role grants written for a root
pub fn record_grants_written(root: &str, count: usize) {
    counter!(
        "menu_sync_role_grants_total",
        "root" => root.to_string()
    )
    .increment(count as u64);
}

/// Record an error
pub fn record_error(root: &str, kind: &str) {
    counter!(
        "menu_sync_errors_total",
        "root" => root.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record how long a root took, whatever the outcome
pub fn record_root_latency(root: &str, duration: Duration) {
    histogram!(
        "menu_sync_root_seconds",
        "root" => root.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record the duration of a full pass
pub fn record_pass_latency(duration: Duration) {
    histogram!("menu_sync_pass_seconds").record(duration.as_secs_f64());
}
