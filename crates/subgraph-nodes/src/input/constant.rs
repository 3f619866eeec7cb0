//! Constant Node
//!
//! Emits the value stored in its configuration.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use subgraph_engine::{
    GraphNode, NodeCategory, NodeDescriptor, NodeExecutor, NodeMetadata, PortDataType,
    PortDescriptor, PortId, Result, SubgraphError,
};

/// Configuration read from `GraphNode::data`
#[derive(Debug, Default, Deserialize)]
struct ConstantData {
    #[serde(default)]
    value: serde_json::Value,
}

/// Constant Node
///
/// # Configuration
/// - `data.value` - The value to emit; a null or missing value emits nothing
///
/// # Outputs
/// - `value` - The configured value
#[derive(Clone, Default)]
pub struct ConstantNode;

impl ConstantNode {
    /// Port ID for the emitted value
    pub const PORT_VALUE: &'static str = "value";
}

impl NodeDescriptor for ConstantNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata {
            node_type: "constant".to_string(),
            category: NodeCategory::Input,
            label: "Constant".to_string(),
            description: "Emits a configured value".to_string(),
            inputs: Vec::new(),
            outputs: vec![PortDescriptor::output(Self::PORT_VALUE, "Value", PortDataType::Any)],
        }
    }
}

fn executor() -> Arc<dyn NodeExecutor> {
    Arc::new(ConstantNode)
}

inventory::submit!(subgraph_engine::NodeTypeFn {
    descriptor: ConstantNode::descriptor,
    executor,
});

impl NodeExecutor for ConstantNode {
    fn execute(
        &self,
        node: &GraphNode,
        _inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>> {
        let data = if node.data.is_null() {
            ConstantData::default()
        } else {
            serde_json::from_value::<ConstantData>(node.data.clone()).map_err(|e| {
                SubgraphError::failed(format!("Invalid configuration for '{}': {}", node.id, e))
            })?
        };

        let mut outputs = HashMap::new();
        if !data.value.is_null() {
            outputs.insert(Self::PORT_VALUE.to_string(), data.value);
        }
        Ok(outputs)
    }
}
