//! Bottom-up biogeography propagation.
//!
//! Every leaf is certain about its own location. Every internal node averages
//! its children's distributions with equal weight `1/n`, regardless of how
//! many leaves sit below each child.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::domain::arena::{NodeId, NodeKind, PhyloTree};
use crate::domain::biogeography::{
    Biogeography, Distribution, RoundingPolicy, DEFAULT_PRECISION, MAX_PRECISION,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::label;

/// Annotates a subtree with display names and location distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagator {
    precision: u32,
    policy: RoundingPolicy,
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION, RoundingPolicy::default())
    }
}

struct Staged {
    node: NodeId,
    display_name: Option<String>,
    biogeography: Biogeography,
}

impl Propagator {
    pub fn new(precision: u32, policy: RoundingPolicy) -> Self {
        Self {
            precision: precision.min(MAX_PRECISION),
            policy,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn policy(&self) -> RoundingPolicy {
        self.policy
    }

    /// Compute the distribution of `start` and of every node below it.
    ///
    /// Results are written to `display_name` (leaves) and `biogeography`
    /// (all nodes) only after the whole subtree resolved; on error the tree
    /// is left untouched.
    ///
    /// # Errors
    /// - `NodeNotFound` if `start` is not in `tree`
    /// - `MalformedLabel` for the first leaf whose label cannot be decoded
    /// - `EmptyInternalNode` for an internal node without children
    #[instrument(level = "debug", skip(self, tree), fields(precision = self.precision, policy = %self.policy))]
    pub fn compute(&self, tree: &mut PhyloTree, start: NodeId) -> DomainResult<Biogeography> {
        if !tree.contains(start) {
            return Err(DomainError::NodeNotFound);
        }

        // distributions handed upward, removed once the parent consumed them
        let mut pending: HashMap<NodeId, Distribution> = HashMap::new();
        let mut staged: Vec<Staged> = Vec::new();

        for (idx, node) in tree.iter_postorder_from(start) {
            let (exact, display_name) = match node.kind {
                NodeKind::Leaf => {
                    let leaf = label::extract(&node.label)?;
                    trace!(label = %node.label, location = %leaf.location, "leaf");
                    (Distribution::certain(leaf.location), Some(leaf.display_name))
                }
                NodeKind::Internal => {
                    if node.children.is_empty() {
                        return Err(DomainError::EmptyInternalNode {
                            node: node.to_string(),
                        });
                    }
                    let weight = node.children.len() as f64;
                    let mut acc = Distribution::default();
                    for child in &node.children {
                        let child_dist = pending.remove(child).ok_or(DomainError::NodeNotFound)?;
                        for (location, p) in child_dist.into_entries() {
                            acc.add(location, p / weight);
                        }
                    }
                    (acc, None)
                }
            };

            let rounded = exact.rounded(self.precision);
            let biogeography = Biogeography::from_rounded(&rounded, self.precision);
            let upward = match self.policy {
                RoundingPolicy::Presentation => exact,
                RoundingPolicy::PerNode => rounded,
            };
            pending.insert(idx, upward);
            staged.push(Staged {
                node: idx,
                display_name,
                biogeography,
            });
        }

        let result = staged
            .last()
            .map(|s| s.biogeography.clone())
            .ok_or(DomainError::NodeNotFound)?;
        debug!(nodes = staged.len(), root = %result, "propagation complete");

        for s in staged {
            if let Some(node) = tree.node_mut(s.node) {
                if s.display_name.is_some() {
                    node.display_name = s.display_name;
                }
                node.biogeography = Some(s.biogeography);
            }
        }
        Ok(result)
    }
}

/// Annotate the subtree at `start` with the default precision and policy.
pub fn compute_biogeography(tree: &mut PhyloTree, start: NodeId) -> DomainResult<Biogeography> {
    Propagator::default().compute(tree, start)
}
