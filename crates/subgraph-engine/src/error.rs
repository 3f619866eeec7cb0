//! Error types for the subgraph engine

use thiserror::Error;

/// Result type alias using SubgraphError
pub type Result<T> = std::result::Result<T, SubgraphError>;

/// Errors that can occur while editing or evaluating graphs
#[derive(Debug, Error)]
pub enum SubgraphError {
    /// A precondition on an argument was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No factory is registered for a node type
    #[error("Unknown node type '{node_type}' for node '{node_id}'")]
    UnknownNodeType { node_id: String, node_type: String },

    /// A node referenced by ID does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A second boundary node of the same kind was added to a definition
    #[error("Definition '{definition_id}' already has a {kind} node")]
    BoundaryConflict { definition_id: String, kind: String },

    /// The graph contains a cycle and has no evaluation order
    #[error("Cycle detected in graph '{graph_id}'")]
    CycleDetected { graph_id: String },

    /// A definition was invoked while already on the invocation stack
    #[error("Subgraph '{0}' references itself")]
    RecursiveSubgraph(String),

    /// A definition ID could not be resolved in the library
    #[error("Subgraph definition not found: {0}")]
    DefinitionNotFound(String),

    /// An edge handle names no port on its node
    #[error("Edge '{edge_id}' references unknown port '{port}'")]
    UnresolvedPort { edge_id: String, port: String },

    /// A node failed while processing
    #[error("Node execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubgraphError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create an invalid argument error with a message
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SubgraphError::BoundaryConflict {
            definition_id: "blur".to_string(),
            kind: "ingress".to_string(),
        };
        assert_eq!(err.to_string(), "Definition 'blur' already has a ingress node");

        let err = SubgraphError::failed("boom");
        assert_eq!(err.to_string(), "Node execution failed: boom");
    }

    #[test]
    fn test_from_serde_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: SubgraphError = parse.unwrap_err().into();
        assert!(matches!(err, SubgraphError::Serialization(_)));
    }
}
