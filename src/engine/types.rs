//! Public types for the menu synchronizer.

use serde::Serialize;

use crate::storage::traits::MenuId;

/// What happened to one root during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RootOutcome {
    /// The root has no `nav.yml`
    NoManifest,
    /// Manifest unchanged since the recorded sync
    UpToDate,
    /// First sync of the root
    Created { menu_ids: Vec<MenuId> },
    /// Rows from the previous sync replaced
    Resynced {
        removed_menus: u64,
        removed_grants: u64,
        menu_ids: Vec<MenuId>,
    },
    /// The root was skipped after an error; other roots were still attempted
    Failed { kind: &'static str, message: String },
}

impl RootOutcome {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoManifest => "skipped",
            Self::UpToDate => "up_to_date",
            Self::Created { .. } => "created",
            Self::Resynced { .. } => "resynced",
            Self::Failed { .. } => "failed",
        }
    }

    /// Menu ids written in this pass, if any.
    pub fn menu_ids(&self) -> &[MenuId] {
        match self {
            Self::Created { menu_ids } | Self::Resynced { menu_ids, .. } => menu_ids,
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl std::fmt::Display for RootOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoManifest => write!(f, "NoManifest"),
            Self::UpToDate => write!(f, "UpToDate"),
            Self::Created { menu_ids } => write!(f, "Created({} menus)", menu_ids.len()),
            Self::Resynced { removed_menus, menu_ids, .. } => {
                write!(f, "Resynced(-{} +{} menus)", removed_menus, menu_ids.len())
            }
            Self::Failed { kind, .. } => write!(f, "Failed({})", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootReport {
    pub key: String,
    #[serde(flatten)]
    pub outcome: RootOutcome,
}

/// Result of a synchronization pass over every root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Menu building is switched off in the configuration
    pub disabled: bool,
    pub roots: Vec<RootReport>,
}

impl SyncReport {
    pub(crate) fn disabled() -> Self {
        Self {
            disabled: true,
            roots: Vec::new(),
        }
    }

    pub fn outcome(&self, key: &str) -> Option<&RootOutcome> {
        self.roots.iter().find(|r| r.key == key).map(|r| &r.outcome)
    }

    /// Roots that failed.
    pub fn failed(&self) -> impl Iterator<Item = &RootReport> {
        self.roots.iter().filter(|r| r.outcome.is_failure())
    }

    /// Check if every root succeeded or was skipped
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Total menu rows written in this pass.
    #[must_use]
    pub fn menus_written(&self) -> usize {
        self.roots.iter().map(|r| r.outcome.menu_ids().len()).sum()
    }
}

/// The entry a documentation landing page links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: String,
    pub uri: String,
}
