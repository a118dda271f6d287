//! Read-only access for rendering backends.

use crate::domain::arena::{NodeId, PhyloTree};
use crate::domain::biogeography::Biogeography;

/// What a renderer may read from an annotated tree.
///
/// Implementors expose results only; nothing here recomputes probabilities.
pub trait BiogeographyView {
    fn biogeography(&self, node: NodeId) -> Option<&Biogeography>;

    fn display_name(&self, node: NodeId) -> Option<&str>;
}

impl BiogeographyView for PhyloTree {
    fn biogeography(&self, node: NodeId) -> Option<&Biogeography> {
        self.node(node).and_then(|n| n.biogeography.as_ref())
    }

    fn display_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(|n| n.display_name.as_deref())
    }
}
