//! Running a subgraph definition against a value buffer

use crate::boundary::{BoundaryFrame, BoundaryKind, EgressNode, IngressNode};
use crate::buffer::PassThroughBuffer;
use crate::definition::SubgraphDefinition;
use crate::engine::{EvaluationContext, GraphRuntime, Node};
use crate::error::Result;
use crate::events::GraphEvent;

/// Stateless executor for subgraph definitions
///
/// All per-call state (seeded inputs, collected outputs) lives in a
/// `BoundaryFrame` created for the call, so the same definition can be
/// invoked from several proxies, or from within itself up to the recursion
/// guard, without cross-talk.
pub struct SubgraphInvocation;

impl SubgraphInvocation {
    /// Evaluate `definition` with `inputs` seeded on its Ingress node and
    /// return what reached its Egress node.
    ///
    /// An absent definition yields an empty buffer. A declared side with no
    /// boundary node (schema edited, `initialize` not re-run) has its values
    /// dropped.
    pub fn run(
        definition: Option<&SubgraphDefinition>,
        inputs: &PassThroughBuffer,
        ctx: &mut EvaluationContext,
    ) -> Result<PassThroughBuffer> {
        let Some(definition) = definition else {
            return Ok(PassThroughBuffer::new());
        };

        ctx.enter_definition(&definition.id)?;
        let result = Self::evaluate(definition, inputs, ctx);
        ctx.exit_definition(&definition.id);
        result
    }

    fn evaluate(
        definition: &SubgraphDefinition,
        inputs: &PassThroughBuffer,
        ctx: &mut EvaluationContext,
    ) -> Result<PassThroughBuffer> {
        if definition.ingress_node().is_none() && !inputs.is_empty() {
            log::debug!(
                "Subgraph '{}' has no ingress node, dropping {} inputs",
                definition.id,
                inputs.len()
            );
        }
        if definition.egress_node().is_none() && !definition.output_refs().is_empty() {
            log::debug!("Subgraph '{}' has no egress node, outputs dropped", definition.id);
        }

        let frame = BoundaryFrame::shared();
        frame.lock().seed(inputs.clone());

        let graph = definition.graph();
        let mut nodes: Vec<Box<dyn Node>> = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let instance: Box<dyn Node> = match BoundaryKind::from_node_type(&node.node_type) {
                Some(BoundaryKind::Ingress) => Box::new(IngressNode::new(
                    node.id.clone(),
                    definition.input_refs().to_vec(),
                    frame.clone(),
                )),
                Some(BoundaryKind::Egress) => Box::new(EgressNode::new(
                    node.id.clone(),
                    definition.output_refs().to_vec(),
                    frame.clone(),
                )),
                None => ctx.registry().create_node(node, ctx)?,
            };
            nodes.push(instance);
        }

        let mut runtime = GraphRuntime::from_nodes(graph.clone(), nodes);
        runtime.evaluate(ctx)?;

        let outputs = {
            let mut frame = frame.lock();
            frame.mark_evaluated();
            frame.take_collected()
        };

        log::debug!(
            "Invoked subgraph '{}': {} inputs, {} outputs",
            definition.id,
            inputs.len(),
            outputs.len()
        );
        ctx.emit(GraphEvent::SubgraphInvoked {
            definition_id: definition.id.clone(),
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::descriptor::{NodeMetadata, PortDescriptor};
    use crate::error::SubgraphError;
    use crate::events::VecEventSink;
    use crate::library::DefinitionLibrary;
    use crate::port_reference::PortReference;
    use crate::registry::NodeRegistry;
    use crate::types::{GraphEdge, GraphNode, NodeCategory, PortDataType};

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::with_core();
        registry.register_callback(
            NodeMetadata {
                node_type: "negate".to_string(),
                category: NodeCategory::Processing,
                label: "Negate".to_string(),
                description: String::new(),
                inputs: vec![PortDescriptor::input("value", "Value", PortDataType::Number)],
                outputs: vec![PortDescriptor::output("value", "Value", PortDataType::Number)],
            },
            |_node, inputs| {
                let n = inputs.get("value").and_then(|v| v.as_f64()).unwrap_or(0.0);
                Ok(HashMap::from([("value".to_string(), serde_json::json!(-n))]))
            },
        );
        registry
    }

    fn context() -> EvaluationContext {
        EvaluationContext::new(Arc::new(registry()), Arc::new(DefinitionLibrary::new()))
    }

    fn negate_definition() -> SubgraphDefinition {
        let mut def = SubgraphDefinition::new("neg", "Negate");
        def.add_ingress_port(PortReference::new("In", PortDataType::Number));
        def.add_egress_port(PortReference::new("Out", PortDataType::Number));
        def.initialize();
        def.add_node(GraphNode::new("n", "negate")).unwrap();

        let ingress = def.ingress_node().unwrap().id.clone();
        let egress = def.egress_node().unwrap().id.clone();
        def.connect(GraphEdge::new("e1", ingress, "In", "n", "value")).unwrap();
        def.connect(GraphEdge::new("e2", "n", "value", egress, "Out")).unwrap();
        def
    }

    fn single(key: &PortReference, value: serde_json::Value) -> PassThroughBuffer {
        std::iter::once((key.clone(), value)).collect()
    }

    #[test]
    fn test_absent_definition_returns_empty() {
        let mut ctx = context();
        let out = SubgraphInvocation::run(None, &PassThroughBuffer::new(), &mut ctx).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_maps_inputs_to_outputs() {
        let def = negate_definition();
        let sink = Arc::new(VecEventSink::new());
        let mut ctx = context().with_event_sink(sink.clone());

        let inputs = single(&def.input_refs()[0], serde_json::json!(3.0));
        let out = SubgraphInvocation::run(Some(&def), &inputs, &mut ctx).unwrap();

        assert_eq!(out.get(&def.output_refs()[0]), Some(&serde_json::json!(-3.0)));
        assert_eq!(ctx.depth(), 0);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            GraphEvent::SubgraphInvoked { definition_id, inputs: 1, outputs: 1 } if definition_id == "neg"
        )));
    }

    #[test]
    fn test_missing_ingress_drops_inputs() {
        let mut def = negate_definition();
        // Schema still declares the input but the node is gone
        let ingress = def.ingress_node().unwrap().id.clone();
        def.remove_node(&ingress);

        let mut ctx = context();
        let inputs = single(&def.input_refs()[0], serde_json::json!(3.0));
        let out = SubgraphInvocation::run(Some(&def), &inputs, &mut ctx).unwrap();

        // negate ran with no input and produced -0
        assert_eq!(out.get(&def.output_refs()[0]), Some(&serde_json::json!(-0.0)));
    }

    #[test]
    fn test_missing_egress_drops_outputs() {
        let mut def = negate_definition();
        let egress = def.egress_node().unwrap().id.clone();
        def.remove_node(&egress);

        let mut ctx = context();
        let inputs = single(&def.input_refs()[0], serde_json::json!(3.0));
        let out = SubgraphInvocation::run(Some(&def), &inputs, &mut ctx).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_recursion_rejected_and_stack_unwound() {
        let def = negate_definition();
        let mut ctx = context();
        ctx.enter_definition("neg").unwrap();

        let err = SubgraphInvocation::run(Some(&def), &PassThroughBuffer::new(), &mut ctx).unwrap_err();
        assert!(matches!(err, SubgraphError::RecursiveSubgraph(id) if id == "neg"));
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_internal_failure_propagates() {
        let mut def = negate_definition();
        def.add_node(GraphNode::new("bad", "unregistered")).unwrap();

        let mut ctx = context();
        let err = SubgraphInvocation::run(Some(&def), &PassThroughBuffer::new(), &mut ctx).unwrap_err();
        assert!(matches!(err, SubgraphError::UnknownNodeType { .. }));
        assert_eq!(ctx.depth(), 0);
    }
}
