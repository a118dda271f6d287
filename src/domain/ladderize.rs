//! Child reordering by subtree size.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::arena::{NodeId, PhyloTree};

/// Sort direction for [`ladderize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Smallest subtrees first
    Ascending,
    /// Largest subtrees first
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("asc"),
            Self::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown direction '{other}' (expected asc or desc)")),
        }
    }
}

/// Reorder every node's children by leaf count.
///
/// Children are sorted stably by ascending size; `Descending` then reverses
/// the list, so equal-sized siblings end up in reversed input order there.
#[instrument(level = "debug", skip(tree))]
pub fn ladderize(tree: &mut PhyloTree, direction: Direction) {
    let mut sizes: HashMap<NodeId, usize> = HashMap::with_capacity(tree.len());
    let mut internal: Vec<NodeId> = Vec::new();

    for (idx, node) in tree.iter_postorder() {
        let size = if node.children.is_empty() {
            1
        } else {
            node.children.iter().map(|c| sizes.get(c).copied().unwrap_or(0)).sum()
        };
        sizes.insert(idx, size);
        if !node.children.is_empty() {
            internal.push(idx);
        }
    }

    for idx in internal {
        if let Some(node) = tree.node_mut(idx) {
            node.children.sort_by_key(|c| sizes.get(c).copied().unwrap_or(0));
            if direction == Direction::Descending {
                node.children.reverse();
            }
        }
    }
}
