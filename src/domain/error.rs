//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree and label invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("malformed leaf label '{label}': {reason}")]
    MalformedLabel { label: String, reason: String },

    #[error("internal node '{node}' has no children")]
    EmptyInternalNode { node: String },

    #[error("node not found in tree")]
    NodeNotFound,

    #[error("tree has no root")]
    EmptyTree,

    #[error("tree already has a root")]
    DuplicateRoot,

    #[error("leaf '{node}' cannot have children")]
    LeafWithChildren { node: String },

    #[error("newick syntax error at byte {position}: {message}")]
    Newick { position: usize, message: String },
}

impl DomainError {
    pub(crate) fn malformed(label: &str, reason: impl Into<String>) -> Self {
        Self::MalformedLabel {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn newick(position: usize, message: impl Into<String>) -> Self {
        Self::Newick {
            position,
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
