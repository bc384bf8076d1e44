// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::ManifestError;
use crate::storage::traits::{StorageError, StoreOp};

/// Errors raised while configuring or running a menu sync.
#[derive(Error, Debug)]
pub enum MenuSyncError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),

    #[error("failed to read manifest {path}: {source}")]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {source}")]
    MalformedManifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("unknown navigation root '{0}'")]
    UnknownRoot(String),

    #[error("malformed bookkeeping entry '{key}': bad id '{segment}'")]
    MalformedSyncRecord { key: String, segment: String },

    #[error("storage query failed ({op}): {source}")]
    StorageQueryFailed {
        op: StoreOp,
        #[source]
        source: StorageError,
    },

    #[error("storage write failed ({op}): {source}")]
    StorageWriteFailed {
        op: StoreOp,
        #[source]
        source: StorageError,
    },
}

impl MenuSyncError {
    pub(crate) fn storage(op: StoreOp, source: StorageError) -> Self {
        if op.is_read() {
            Self::StorageQueryFailed { op, source }
        } else {
            Self::StorageWriteFailed { op, source }
        }
    }

    /// Errors that stop the whole pass instead of just the current root.
    ///
    /// The starting `order` cannot be defaulted safely, so failing to read
    /// it ends the pass.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid(_) | Self::StorageQueryFailed { op: StoreOp::MaxOrder, .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigInvalid(_) => "config_invalid",
            Self::ManifestUnreadable { .. } => "manifest_unreadable",
            Self::MalformedManifest { .. } => "malformed_manifest",
            Self::UnknownRoot(_) => "unknown_root",
            Self::MalformedSyncRecord { .. } => "malformed_sync_record",
            Self::StorageQueryFailed { .. } => "storage_query_failed",
            Self::StorageWriteFailed { .. } => "storage_write_failed",
        }
    }
}

/// Map a store result into the engine error for `op`.
pub(crate) trait StoreResultExt<T> {
    fn during(self, op: StoreOp) -> Result<T, MenuSyncError>;
}

impl<T> StoreResultExt<T> for Result<T, StorageError> {
    fn during(self, op: StoreOp) -> Result<T, MenuSyncError> {
        self.map_err(|e| MenuSyncError::storage(op, e))
    }
}
