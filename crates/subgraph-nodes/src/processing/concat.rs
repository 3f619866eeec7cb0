//! Concat Node
//!
//! Joins two text inputs with an optional separator.

use std::collections::HashMap;
use std::sync::Arc;

use subgraph_engine::{
    GraphNode, NodeCategory, NodeDescriptor, NodeExecutor, NodeMetadata, PortDataType,
    PortDescriptor, PortId, Result,
};

/// Concat Node
///
/// Non-string inputs are rendered as JSON text. A missing input counts as
/// the empty string.
///
/// # Inputs
/// - `a` - Leading text
/// - `b` - Trailing text
///
/// # Configuration
/// - `data.separator` - Inserted between `a` and `b` (default: none)
///
/// # Outputs
/// - `text` - The joined text
#[derive(Clone, Default)]
pub struct ConcatNode;

impl ConcatNode {
    pub const PORT_A: &'static str = "a";
    pub const PORT_B: &'static str = "b";
    pub const PORT_TEXT: &'static str = "text";
}

impl NodeDescriptor for ConcatNode {
    fn descriptor() -> NodeMetadata {
        NodeMetadata {
            node_type: "concat".to_string(),
            category: NodeCategory::Processing,
            label: "Concat".to_string(),
            description: "Joins two text values".to_string(),
            inputs: vec![
                PortDescriptor::input(Self::PORT_A, "A", PortDataType::String),
                PortDescriptor::input(Self::PORT_B, "B", PortDataType::String),
            ],
            outputs: vec![PortDescriptor::output(Self::PORT_TEXT, "Text", PortDataType::String)],
        }
    }
}

fn executor() -> Arc<dyn NodeExecutor> {
    Arc::new(ConcatNode)
}

inventory::submit!(subgraph_engine::NodeTypeFn {
    descriptor: ConcatNode::descriptor,
    executor,
});

fn as_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl NodeExecutor for ConcatNode {
    fn execute(
        &self,
        node: &GraphNode,
        inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>> {
        let separator = node
            .data
            .get("separator")
            .and_then(|s| s.as_str())
            .unwrap_or("");

        let text = format!(
            "{}{}{}",
            as_text(inputs.get(Self::PORT_A)),
            separator,
            as_text(inputs.get(Self::PORT_B))
        );
        log::trace!("ConcatNode {}: {} chars", node.id, text.len());

        Ok(HashMap::from([(
            Self::PORT_TEXT.to_string(),
            serde_json::Value::String(text),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(node: &GraphNode, a: serde_json::Value, b: serde_json::Value) -> serde_json::Value {
        let inputs = HashMap::from([("a".to_string(), a), ("b".to_string(), b)]);
        ConcatNode.execute(node, inputs).unwrap()["text"].clone()
    }

    #[test]
    fn test_concat() {
        let node = GraphNode::new("c", "concat");
        assert_eq!(run(&node, "foo".into(), "bar".into()), "foobar");
    }

    #[test]
    fn test_separator_and_non_strings() {
        let node = GraphNode::new("c", "concat").with_data(serde_json::json!({"separator": " = "}));
        assert_eq!(run(&node, "x".into(), serde_json::json!(3)), "x = 3");
    }

    #[test]
    fn test_missing_input() {
        let node = GraphNode::new("c", "concat");
        let inputs = HashMap::from([("b".to_string(), serde_json::json!("only"))]);
        let outputs = ConcatNode.execute(&node, inputs).unwrap();
        assert_eq!(outputs["text"], "only");
    }
}
