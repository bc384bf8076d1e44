// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Documentation menu sync example.
//!
//! Demonstrates:
//! 1. Writing a `nav.yml` for a default and an extra root
//! 2. Syncing both into a fresh SQLite admin database
//! 3. Re-running the pass (nothing to do)
//! 4. Editing a manifest and resyncing
//! 5. Displaying the report as JSON and the recorded metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example sync_docs
//! ```

use std::path::Path;

use menu_sync::{LibrarianConfig, MenuSynchronizer, RootConfig};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("menu_sync=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Lay out two documentation roots
    // ─────────────────────────────────────────────────────────────────────────
    let workspace = tempfile::tempdir()?;
    let docs = workspace.path().join("docs");
    let docs_v2 = workspace.path().join("docs-v2");
    std::fs::create_dir_all(&docs)?;
    std::fs::create_dir_all(&docs_v2)?;

    write_nav(
        &docs,
        r#"
nav:
  - Home: index.md
  - Guide:
      - Install: guide/install.md
      - Configure:
          - Basics: guide/configure/basics.md
          - Roles: guide/configure/roles.md
  - FAQ: faq.md
"#,
    )?;
    write_nav(&docs_v2, "nav:\n  - Whats New: changelog.md\n")?;

    let mut config = LibrarianConfig::new(docs.to_string_lossy());
    config.prefix = "docs".into();
    config.menu_user_role_id = 1;
    config.sql_url = Some(format!(
        "sqlite://{}?mode=rwc",
        workspace.path().join("admin.db").display()
    ));
    config.roots.insert(
        "v2".into(),
        RootConfig {
            path: docs_v2.to_string_lossy().into_owned(),
            title: Some("Docs v2".into()),
        },
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 2. First pass creates every menu row
    // ─────────────────────────────────────────────────────────────────────────
    let sync = MenuSynchronizer::connect(&config).await?;
    let report = sync.sync_all().await?;
    println!("First pass:\n{}\n", serde_json::to_string_pretty(&report)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Nothing changed, nothing written
    // ─────────────────────────────────────────────────────────────────────────
    let report = sync.sync_all().await?;
    println!("Second pass:\n{}\n", serde_json::to_string_pretty(&report)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Edit one manifest; only that root resyncs
    // ─────────────────────────────────────────────────────────────────────────
    write_nav(&docs_v2, "nav:\n  - Whats New: changelog.md\n  - Upgrading: upgrade.md\n")?;
    let report = sync.sync_all().await?;
    println!("After edit:\n{}\n", serde_json::to_string_pretty(&report)?);

    if let Some(entry) = sync.first_menu("def").await? {
        println!("Landing page: {} -> {}\n", entry.label, entry.uri);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    dump_metrics(&snapshotter);
    Ok(())
}

fn write_nav(dir: &Path, yaml: &str) -> std::io::Result<()> {
    std::fs::write(dir.join("nav.yml"), yaml)
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines: Vec<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| {
            let (_, key) = composite_key.into_parts();
            let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
            let value = match value {
                DebugValue::Counter(v) => v.to_string(),
                DebugValue::Gauge(v) => v.into_inner().to_string(),
                DebugValue::Histogram(samples) => {
                    let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                    format!("count={} sum={:.4}s", samples.len(), sum)
                }
            };
            format!("  {}{{{}}} {}", key.name(), labels.join(","), value)
        })
        .collect();
    lines.sort();

    println!("Metrics:");
    for line in lines {
        println!("{}", line);
    }
}
