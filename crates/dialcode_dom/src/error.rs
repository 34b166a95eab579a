//! Element tree error types

use thiserror::Error;

use crate::NodeId;

/// Errors raised by [`Document`](crate::Document) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node was removed from the document (or never existed)
    #[error("node {0:?} is not in the document")]
    NodeNotFound(NodeId),

    /// Inserting the node would create a cycle
    #[error("cannot insert {child:?} under {parent:?}: it is an ancestor of the parent")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The selector string could not be parsed
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
}

/// Result type for element tree operations
pub type Result<T> = std::result::Result<T, DomError>;
