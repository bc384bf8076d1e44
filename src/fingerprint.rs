// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Manifest fingerprints and the resync decision.
//!
//! The fingerprint of the raw `nav.yml` bytes is stored next to the id list
//! of the last sync. Comparing the two decides whether a root needs work.
//!
//! # Example
//!
//! ```
//! use menu_sync::fingerprint::{Fingerprint, FingerprintAlgorithm, SyncDecision};
//!
//! let fp = Fingerprint::compute(FingerprintAlgorithm::Md5, b"nav: []\n");
//! assert_eq!(fp.as_str().len(), 32);
//!
//! let stored = fp.as_str().to_string();
//! assert_eq!(SyncDecision::decide(true, Some(&stored), &fp), SyncDecision::UpToDate);
//! assert_eq!(SyncDecision::decide(false, Some(&stored), &fp), SyncDecision::NoPriorSync);
//! ```

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Digest used for manifest fingerprints.
///
/// Installations that already hold fingerprints must keep the algorithm that
/// produced them, otherwise every root resyncs once after the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    #[default]
    Md5,
    Sha256,
}

/// Lowercase hex digest of a manifest's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(algorithm: FingerprintAlgorithm, bytes: &[u8]) -> Self {
        let digest = match algorithm {
            FingerprintAlgorithm::Md5 => hex::encode(Md5::digest(bytes)),
            FingerprintAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        };
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a stored value, ignoring hex case and surrounding whitespace.
    pub fn matches(&self, stored: &str) -> bool {
        self.0.eq_ignore_ascii_case(stored.trim())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a root needs, given its bookkeeping and the current manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    /// No id list recorded: materialize from scratch
    NoPriorSync,
    /// Recorded fingerprint matches: nothing to do
    UpToDate,
    /// Manifest changed since the recorded sync: replace the old rows
    StaleSyncRequired,
}

impl SyncDecision {
    /// `has_prior_ids`: whether the id-list entry exists for the root.
    /// `stored`: the recorded fingerprint, if any.
    pub fn decide(has_prior_ids: bool, stored: Option<&str>, current: &Fingerprint) -> Self {
        if !has_prior_ids {
            return Self::NoPriorSync;
        }
        match stored {
            Some(stored) if current.matches(stored) => Self::UpToDate,
            _ => Self::StaleSyncRequired,
        }
    }

    #[must_use]
    pub fn needs_sync(self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

impl std::fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPriorSync => write!(f, "NoPriorSync"),
            Self::UpToDate => write!(f, "UpToDate"),
            Self::StaleSyncRequired => write!(f, "StaleSyncRequired"),
        }
    }
}
