//! Domain layer: tree model and the biogeography core
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod biogeography;
pub mod error;
pub mod label;
pub mod ladderize;
pub mod newick;
pub mod propagate;
pub mod traits;

pub use arena::{NodeId, NodeKind, PhyloTree, TreeNode};
pub use biogeography::{Biogeography, Distribution, Probability, RoundingPolicy};
pub use error::{DomainError, DomainResult};
pub use label::{extract, LeafName, LocationCode};
pub use ladderize::{ladderize, Direction};
pub use newick::parse_newick;
pub use propagate::{compute_biogeography, Propagator};
pub use traits::BiogeographyView;
