//! Error types for document operations

use crate::NodeId;
use thiserror::Error;

/// Errors returned by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The id does not name a node of this document
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The operation needs an element node
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    /// `child` is not a child of `parent`
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Inserting would place a node inside itself, or move the document node
    #[error("Hierarchy request error: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
