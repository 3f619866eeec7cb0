//! Control nodes
//!
//! Nodes for routing values through a graph.

mod conditional;

pub use conditional::ConditionalNode;
