//! Forward Node
//!
//! Passes its input through unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use subgraph_engine::{
    GraphNode, NodeCategory, NodeDescriptor, NodeExecutor, NodeMetadata, PortDataType,
    PortDescriptor, PortId, Result,
};

/// Forward Node
///
/// # Inputs
/// - `value` - Any value
///
/// # Outputs
/// - `value` - The same value; nothing if the input had no value
#[derive(Clone, Default)]
pub struct ForwardNode;

impl ForwardNode {
    /// Port ID for both the input and the output
    pub const PORT_VALUE: &'static str = "value";
}

impl NodeDescriptor for ForwardNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata {
            node_type: "forward".to_string(),
            category: NodeCategory::Processing,
            label: "Forward".to_string(),
            description: "Passes its input through unchanged".to_string(),
            inputs: vec![PortDescriptor::input(Self::PORT_VALUE, "Value", PortDataType::Any)],
            outputs: vec![PortDescriptor::output(Self::PORT_VALUE, "Value", PortDataType::Any)],
        }
    }
}

fn executor() -> Arc<dyn NodeExecutor> {
    Arc::new(ForwardNode)
}

inventory::submit!(subgraph_engine::NodeTypeFn {
    descriptor: ForwardNode::descriptor,
    executor,
});

impl NodeExecutor for ForwardNode {
    fn execute(
        &self,
        _node: &GraphNode,
        mut inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>> {
        let mut outputs = HashMap::new();
        if let Some(value) = inputs.remove(Self::PORT_VALUE) {
            outputs.insert(Self::PORT_VALUE.to_string(), value);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_value() {
        let inputs = HashMap::from([("value".to_string(), serde_json::json!({"k": "v"}))]);
        let outputs = ForwardNode
            .execute(&GraphNode::new("f", "forward"), inputs)
            .unwrap();
        assert_eq!(outputs["value"], serde_json::json!({"k": "v"}));
    }

    #[test]
    fn test_no_input_no_output() {
        let outputs = ForwardNode
            .execute(&GraphNode::new("f", "forward"), HashMap::new())
            .unwrap();
        assert!(outputs.is_empty());
    }
}
