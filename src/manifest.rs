// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Navigation manifest parsing.
//!
//! A root's `nav.yml` lists its menu as nested single-entry mappings:
//!
//! ```yaml
//! nav:
//!   - Home: index.md
//!   - Guide:
//!       - Intro: guide/intro.md
//!       - Advanced:
//!           - Tuning: guide/tuning.md
//! ```
//!
//! A scalar value makes a leaf pointing at a document, a list makes a branch.
//! Branches may appear at the first two levels only; the third level holds
//! leaves.
//!
//! # Example
//!
//! ```
//! use menu_sync::manifest::{NavManifest, NavNode};
//!
//! let manifest = NavManifest::from_yaml_str("nav:\n  - Guide:\n      - Intro: guide/intro.md\n").unwrap();
//! assert_eq!(manifest.node_count(), 2);
//! assert!(matches!(&manifest.nodes()[0], NavNode::Branch { label, .. } if label == "Guide"));
//! ```

use serde_yaml::Value;
use thiserror::Error;

/// Deepest level a node may sit at. Nodes at this level must be leaves.
pub const MAX_DEPTH: usize = 3;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("manifest has no `nav` list")]
    MissingNav,
    #[error("{at}: expected a list of entries")]
    NotAList { at: String },
    #[error("{at}: expected a `label: value` mapping")]
    NotAMapping { at: String },
    #[error("{at}: label must be a non-empty scalar")]
    InvalidLabel { at: String },
    #[error("{at}: '{label}' must map to a document path or a list of entries")]
    InvalidTarget { at: String, label: String },
    #[error("{at}: '{label}' nests deeper than {max} levels")]
    TooDeep { at: String, label: String, max: usize },
}

/// One entry of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavNode {
    Leaf { label: String, target_path: String },
    Branch { label: String, children: Vec<NavNode> },
}

impl NavNode {
    pub fn label(&self) -> &str {
        match self {
            Self::Leaf { label, .. } | Self::Branch { label, .. } => label,
        }
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }

    /// Children of a branch; empty for leaves.
    pub fn children(&self) -> &[NavNode] {
        match self {
            Self::Branch { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }
}

/// A node in pre-order position, with its parent's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNavEntry<'a> {
    /// Index of the parent entry in the flattened list, `None` at top level
    pub parent: Option<usize>,
    pub depth: usize,
    pub node: &'a NavNode,
}

/// Parsed navigation tree of one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavManifest {
    nodes: Vec<NavNode>,
}

impl NavManifest {
    #[must_use]
    pub fn new(nodes: Vec<NavNode>) -> Self {
        Self { nodes }
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ManifestError> {
        Self::parse(source.as_bytes())
    }

    /// Parse raw `nav.yml` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let doc: Value = serde_yaml::from_slice(bytes)?;
        let nav = match &doc {
            Value::Mapping(map) => map.get("nav").ok_or(ManifestError::MissingNav)?,
            _ => return Err(ManifestError::MissingNav),
        };
        let nodes = parse_entries(nav, "nav", 1)?;
        Ok(Self { nodes })
    }

    /// Top-level nodes in display order.
    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    /// Total number of nodes at every level.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.flatten().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, pre-order, left-to-right listing of every node.
    pub fn flatten(&self) -> Vec<FlatNavEntry<'_>> {
        let mut out = Vec::new();
        let mut stack: Vec<(Option<usize>, usize, &NavNode)> =
            self.nodes.iter().rev().map(|n| (None, 1, n)).collect();

        while let Some((parent, depth, node)) = stack.pop() {
            let index = out.len();
            out.push(FlatNavEntry { parent, depth, node });
            for child in node.children().iter().rev() {
                stack.push((Some(index), depth + 1, child));
            }
        }
        out
    }
}

fn parse_entries(value: &Value, at: &str, depth: usize) -> Result<Vec<NavNode>, ManifestError> {
    let items = match value {
        Value::Sequence(items) => items,
        _ => return Err(ManifestError::NotAList { at: at.to_string() }),
    };

    let mut nodes = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_at = format!("{}[{}]", at, i);
        let map = match item {
            Value::Mapping(map) if !map.is_empty() => map,
            _ => return Err(ManifestError::NotAMapping { at: item_at }),
        };

        // serde_yaml keeps mapping entries in document order
        for (key, value) in map {
            let label = parse_label(key).ok_or_else(|| ManifestError::InvalidLabel {
                at: item_at.clone(),
            })?;
            nodes.push(parse_node(label, value, &item_at, depth)?);
        }
    }
    Ok(nodes)
}

fn parse_node(label: String, value: &Value, at: &str, depth: usize) -> Result<NavNode, ManifestError> {
    match value {
        Value::String(path) if !path.trim().is_empty() => Ok(NavNode::Leaf {
            label,
            target_path: path.clone(),
        }),
        Value::Sequence(_) if depth >= MAX_DEPTH => Err(ManifestError::TooDeep {
            at: at.to_string(),
            label,
            max: MAX_DEPTH,
        }),
        Value::Sequence(_) => {
            let children = parse_entries(value, &format!("{}.{}", at, label), depth + 1)?;
            Ok(NavNode::Branch { label, children })
        }
        _ => Err(ManifestError::InvalidTarget {
            at: at.to_string(),
            label,
        }),
    }
}

fn parse_label(key: &Value) -> Option<String> {
    let label = match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if label.trim().is_empty() {
        None
    } else {
        Some(label)
    }
}
