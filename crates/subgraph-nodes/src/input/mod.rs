//! Input nodes
//!
//! Nodes that produce values without upstream connections.

mod constant;

pub use constant::ConstantNode;
