//! Conditional Node
//!
//! Routes data based on a boolean condition.
//! This node enables branching in graphs by directing the input value to
//! one of two output ports.

use std::collections::HashMap;
use std::sync::Arc;

use subgraph_engine::{
    GraphNode, NodeCategory, NodeDescriptor, NodeExecutor, NodeMetadata, PortDataType,
    PortDescriptor, PortId, Result, SubgraphError,
};

/// Conditional Node
///
/// When the condition is true, the value flows to `true_out`.
/// When the condition is false, the value flows to `false_out`.
/// The other output carries no value, so edges leaving it keep whatever
/// they held.
///
/// # Inputs
/// - `condition` (required) - Boolean condition
/// - `value` (required) - Value to route
///
/// # Outputs
/// - `true_out` - Output when condition is true
/// - `false_out` - Output when condition is false
#[derive(Clone, Default)]
pub struct ConditionalNode;

impl ConditionalNode {
    /// Port ID for condition input
    pub const PORT_CONDITION: &'static str = "condition";
    /// Port ID for value input
    pub const PORT_VALUE: &'static str = "value";
    /// Port ID for true output
    pub const PORT_TRUE_OUT: &'static str = "true_out";
    /// Port ID for false output
    pub const PORT_FALSE_OUT: &'static str = "false_out";
}

impl NodeDescriptor for ConditionalNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata {
            node_type: "conditional".to_string(),
            category: NodeCategory::Control,
            label: "Conditional".to_string(),
            description: "Routes data based on a boolean condition".to_string(),
            inputs: vec![
                PortDescriptor::input(Self::PORT_CONDITION, "Condition", PortDataType::Boolean),
                PortDescriptor::input(Self::PORT_VALUE, "Value", PortDataType::Any),
            ],
            outputs: vec![
                PortDescriptor::output(Self::PORT_TRUE_OUT, "True", PortDataType::Any),
                PortDescriptor::output(Self::PORT_FALSE_OUT, "False", PortDataType::Any),
            ],
        }
    }
}

fn executor() -> Arc<dyn NodeExecutor> {
    Arc::new(ConditionalNode)
}

inventory::submit!(subgraph_engine::NodeTypeFn {
    descriptor: ConditionalNode::descriptor,
    executor,
});

impl NodeExecutor for ConditionalNode {
    fn execute(
        &self,
        node: &GraphNode,
        mut inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>> {
        let condition = inputs
            .get(Self::PORT_CONDITION)
            .and_then(|c| c.as_bool())
            .ok_or_else(|| {
                SubgraphError::failed(format!(
                    "Node '{}': missing or non-boolean input 'condition'",
                    node.id
                ))
            })?;
        let value = inputs.remove(Self::PORT_VALUE).ok_or_else(|| {
            SubgraphError::failed(format!("Node '{}': missing required input 'value'", node.id))
        })?;

        let port = if condition {
            Self::PORT_TRUE_OUT
        } else {
            Self::PORT_FALSE_OUT
        };
        log::debug!("ConditionalNode {}: routed to {}", node.id, port);

        Ok(HashMap::from([(port.to_string(), value)]))
    }
}
