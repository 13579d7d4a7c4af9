use pm_core::NodeId;

/// Why an edit operation was rejected. The document is untouched on error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// The operation needs a selected node and none is selected.
    #[error("no node selected")]
    NoSelection,

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Companion cards are derived and cannot be edited or used as a source.
    #[error("node {0} is not a primary node")]
    NotPrimary(NodeId),

    #[error("edit would create more than {limit} nodes")]
    TooManyNodes { limit: usize },
}
