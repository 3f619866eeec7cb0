//! Subgraph Nodes
//!
//! Built-in node types for the subgraph engine. Each node is registered at
//! link time and picked up by `NodeRegistry::with_builtins`.
//!
//! # Categories
//!
//! - **Input**: Nodes that produce values from their configuration
//! - **Processing**: Nodes that transform values
//! - **Control**: Nodes for routing values

pub mod control;
pub mod input;
pub mod processing;

// Re-export all nodes for convenience
pub use control::*;
pub use input::*;
pub use processing::*;

#[cfg(test)]
mod tests {
    use subgraph_engine::NodeRegistry;

    #[test]
    fn test_inventory_collects_all_builtins() {
        let registry = NodeRegistry::with_builtins();

        // 4 built-ins plus ingress, egress and the proxy
        assert_eq!(registry.all_metadata().len(), 7);

        assert!(registry.has_node_type("constant"));
        assert!(registry.has_node_type("forward"));
        assert!(registry.has_node_type("concat"));
        assert!(registry.has_node_type("conditional"));
        assert!(registry.has_node_type("subgraph"));
    }
}
