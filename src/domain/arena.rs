use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::biogeography::Biogeography;
use crate::domain::error::{DomainError, DomainResult};

/// Handle of a node inside a [`PhyloTree`].
pub type NodeId = Index;

/// Whether a node is an observed taxon or an inferred ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Internal,
}

/// Tree node in the arena-based phylogeny.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Leaf identifying name (`Genus_species_accession_location`), or the
    /// optional name/support value of an internal node
    pub label: String,
    /// Branch length from the input file, never used for weighting
    pub branch_length: Option<f64>,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<NodeId>,
    /// Indices of child nodes in the arena, in input order
    pub children: Vec<NodeId>,
    /// Presentation name, set by the propagator for leaves
    pub display_name: Option<String>,
    /// Location distribution, set by the propagator
    pub biogeography: Option<Biogeography>,
}

impl TreeNode {
    fn new(kind: NodeKind, label: String, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            label,
            branch_length: None,
            parent,
            children: Vec::new(),
            display_name: None,
            biogeography: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Display name if one was assigned, the raw label otherwise.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.label)
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.label.is_empty()) {
            (NodeKind::Internal, true) => write!(f, "<internal>"),
            _ => write!(f, "{}", self.label),
        }
    }
}

/// Arena-based rooted tree.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Traversals use explicit stacks, so depth is bounded by memory only.
#[derive(Debug, Clone)]
pub struct PhyloTree {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
}

impl Default for PhyloTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PhyloTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node below `parent`, or as the root when `parent` is None.
    ///
    /// # Errors
    /// - `NodeNotFound` if `parent` is not in this tree
    /// - `LeafWithChildren` if `parent` is a leaf
    /// - `DuplicateRoot` if a root already exists and `parent` is None
    #[instrument(level = "trace", skip(self, label))]
    pub fn insert_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeId>,
    ) -> DomainResult<NodeId> {
        match parent {
            Some(parent_idx) => {
                let parent_node = self.arena.get(parent_idx).ok_or(DomainError::NodeNotFound)?;
                if parent_node.is_leaf() {
                    return Err(DomainError::LeafWithChildren {
                        node: parent_node.to_string(),
                    });
                }
            }
            None if self.root.is_some() => return Err(DomainError::DuplicateRoot),
            None => {}
        }

        let node_idx = self.arena.insert(TreeNode::new(kind, label.into(), parent));
        match parent {
            Some(parent_idx) => {
                if let Some(parent) = self.arena.get_mut(parent_idx) {
                    parent.children.push(node_idx);
                }
            }
            None => self.root = Some(node_idx),
        }
        Ok(node_idx)
    }

    pub fn insert_leaf(&mut self, label: impl Into<String>, parent: Option<NodeId>) -> DomainResult<NodeId> {
        self.insert_node(NodeKind::Leaf, label, parent)
    }

    pub fn insert_internal(&mut self, label: impl Into<String>, parent: Option<NodeId>) -> DomainResult<NodeId> {
        self.insert_node(NodeKind::Internal, label, parent)
    }

    pub fn node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, idx: NodeId) -> bool {
        self.arena.contains(idx)
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Post-order traversal from the root: children before parents,
    /// siblings left to right.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.root)
    }

    /// Post-order traversal of the subtree rooted at `start`.
    pub fn iter_postorder_from(&self, start: NodeId) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, Some(start))
    }

    /// Number of nodes on the longest root-to-leaf path, 0 for an empty tree.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.into_iter().map(|r| (r, 1)).collect();

        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.node(idx) {
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        max_depth
    }

    /// All leaves in left-to-right order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Number of leaves below (and including) `idx`.
    pub fn leaf_count(&self, idx: NodeId) -> usize {
        self.iter_postorder_from(idx)
            .filter(|(_, node)| node.is_leaf())
            .count()
    }

    /// First node in pre-order whose raw label equals `label`.
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.label == label)
            .map(|(idx, _)| idx)
    }
}

pub struct TreeIterator<'a> {
    tree: &'a PhyloTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a PhyloTree, start: Option<NodeId>) -> Self {
        Self {
            tree,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a PhyloTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a PhyloTree, start: Option<NodeId>) -> Self {
        Self {
            tree,
            stack: start.into_iter().map(|idx| (idx, false)).collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.node(current_idx) {
                if visited {
                    return Some((current_idx, node));
                }
                self.stack.push((current_idx, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
