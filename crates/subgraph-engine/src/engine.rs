//! Synchronous graph runtime
//!
//! This is the generic execution contract the subgraph machinery plugs into.
//! A pass walks the graph once in topological order; for every node it
//!
//! 1. hands each input port slot its connected edges (`Node::pull`),
//! 2. runs the node (`Node::process`),
//! 3. hands each output port slot its connected edges (`Node::push`).
//!
//! Edges are rebuilt at the start of every pass by resolving their handles
//! against the ports the nodes report *now*, so nodes with dynamic ports are
//! picked up without any cached port state. Edge values live only for the
//! pass that produced them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{EvaluationConfig, UnresolvedEdgePolicy};
use crate::descriptor::{PortDescriptor, PortDirection};
use crate::error::{Result, SubgraphError};
use crate::events::{EventSink, GraphEvent, NullEventSink};
use crate::library::DefinitionLibrary;
use crate::registry::NodeRegistry;
use crate::types::{EdgeId, NodeGraph, NodeId};

/// An edge as seen by nodes during one pass
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedEdge {
    pub id: EdgeId,
    pub source: NodeId,
    /// Descriptor of the output port the edge leaves from
    pub source_port: Option<PortDescriptor>,
    pub target: NodeId,
    /// Descriptor of the input port the edge enters
    pub target_port: Option<PortDescriptor>,
    /// The value currently carried by the edge
    pub value: Option<serde_json::Value>,
}

impl ConnectedEdge {
    /// Create an edge between two resolved ports, carrying no value
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        source_port: PortDescriptor,
        target: impl Into<String>,
        target_port: PortDescriptor,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_port: Some(source_port),
            target: target.into(),
            target_port: Some(target_port),
            value: None,
        }
    }

    /// Set the carried value
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// A node instance taking part in evaluation
///
/// Ports are recomputed on every call to `input_ports`/`output_ports`; the
/// runtime never caches them across passes.
pub trait Node: Send {
    fn id(&self) -> &str;

    fn node_type(&self) -> &str;

    /// Called when the node is placed in a runtime and whenever its ports
    /// may have changed shape.
    fn initialize_ports(&mut self) {}

    fn input_ports(&self) -> Vec<PortDescriptor>;

    fn output_ports(&self) -> Vec<PortDescriptor>;

    /// Receive the edges connected to one input port, in connection order
    fn pull(&mut self, edges: &[ConnectedEdge], ctx: &mut EvaluationContext) -> Result<()>;

    fn process(&mut self, ctx: &mut EvaluationContext) -> Result<()>;

    /// Write values onto the edges connected to one output port
    fn push(&mut self, edges: &mut [ConnectedEdge], ctx: &mut EvaluationContext) -> Result<()>;

    /// Drop any per-pass state once all output slots have been pushed
    fn end_pass(&mut self) {}
}

/// Everything a pass needs besides the graph itself
///
/// The stack of active definitions is call-local: it belongs to the pass
/// being evaluated, never to a shared definition.
pub struct EvaluationContext {
    registry: Arc<NodeRegistry>,
    library: Arc<DefinitionLibrary>,
    config: EvaluationConfig,
    events: Arc<dyn EventSink>,
    active_definitions: Vec<String>,
}

impl EvaluationContext {
    /// Create a context with default configuration and no event consumer
    pub fn new(registry: Arc<NodeRegistry>, library: Arc<DefinitionLibrary>) -> Self {
        Self {
            registry,
            library,
            config: EvaluationConfig::default(),
            events: Arc::new(NullEventSink),
            active_definitions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn library(&self) -> &DefinitionLibrary {
        &self.library
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Report an event if events are enabled
    pub fn emit(&self, event: GraphEvent) {
        if !self.config.emit_events {
            return;
        }
        if let Err(e) = self.events.send(event) {
            log::warn!("Dropping graph event: {}", e);
        }
    }

    /// Push a definition onto the invocation stack
    pub fn enter_definition(&mut self, definition_id: &str) -> Result<()> {
        if self.active_definitions.iter().any(|id| id == definition_id) {
            return Err(SubgraphError::RecursiveSubgraph(definition_id.to_string()));
        }
        self.active_definitions.push(definition_id.to_string());
        Ok(())
    }

    /// Pop a definition pushed by `enter_definition`
    pub fn exit_definition(&mut self, definition_id: &str) {
        if let Some(pos) = self.active_definitions.iter().rposition(|id| id == definition_id) {
            self.active_definitions.remove(pos);
        }
    }

    /// Number of subgraph invocations currently in progress
    pub fn depth(&self) -> usize {
        self.active_definitions.len()
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub graph_id: String,
    /// Nodes in the order they were processed
    pub processed: Vec<NodeId>,
    /// Edges left out because a handle did not resolve
    pub skipped_edges: Vec<EdgeId>,
    /// Values carried by edges when the pass finished
    pub edge_values: HashMap<EdgeId, serde_json::Value>,
}

impl EvaluationReport {
    /// Value carried by an edge at the end of the pass
    pub fn edge_value(&self, edge_id: &str) -> Option<&serde_json::Value> {
        self.edge_values.get(edge_id)
    }
}

/// A graph together with its live node instances
///
/// Node instances persist across passes; edges and their values do not.
pub struct GraphRuntime {
    graph: NodeGraph,
    nodes: Vec<Box<dyn Node>>,
}

impl GraphRuntime {
    /// Instantiate every node through the context's registry
    pub fn instantiate(graph: NodeGraph, ctx: &EvaluationContext) -> Result<Self> {
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            nodes.push(ctx.registry().create_node(node, ctx)?);
        }
        Ok(Self::from_nodes(graph, nodes))
    }

    /// Build a runtime from pre-made node instances
    pub fn from_nodes(graph: NodeGraph, mut nodes: Vec<Box<dyn Node>>) -> Self {
        for node in &mut nodes {
            node.initialize_ports();
        }
        Self { graph, nodes }
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&dyn Node> {
        self.nodes.iter().find(|n| n.id() == id).map(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Box<dyn Node>> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    /// Re-run port initialization on every node
    pub fn initialize_ports(&mut self) {
        for node in &mut self.nodes {
            node.initialize_ports();
        }
    }

    /// Run one evaluation pass
    pub fn evaluate(&mut self, ctx: &mut EvaluationContext) -> Result<EvaluationReport> {
        let order = self.graph.topological_order()?;
        let graph_id = self.graph.id.clone();
        ctx.emit(GraphEvent::PassStarted {
            graph_id: graph_id.clone(),
            node_count: order.len(),
        });

        let mut report = EvaluationReport {
            graph_id: graph_id.clone(),
            ..EvaluationReport::default()
        };
        if let Err(e) = self.run_pass(ctx, &order, &mut report) {
            // Nodes after the failure never reached end_pass
            self.reset_nodes();
            return Err(e);
        }

        log::debug!(
            "Evaluated graph '{}': {} nodes, {} edges skipped",
            graph_id,
            report.processed.len(),
            report.skipped_edges.len()
        );
        ctx.emit(GraphEvent::PassCompleted { graph_id });
        Ok(report)
    }

    fn run_pass(
        &mut self,
        ctx: &mut EvaluationContext,
        order: &[NodeId],
        report: &mut EvaluationReport,
    ) -> Result<()> {
        let mut edges = self.connect_edges(ctx, report)?;

        for node_id in order {
            let Some(node) = self.nodes.iter_mut().find(|n| n.id() == node_id.as_str()) else {
                return Err(SubgraphError::NodeNotFound(node_id.clone()));
            };

            for slot in port_slots(&edges, node_id, PortDirection::Input) {
                let slot_edges: Vec<ConnectedEdge> = slot.iter().map(|&i| edges[i].clone()).collect();
                node.pull(&slot_edges, ctx)?;
            }

            node.process(ctx)?;

            for slot in port_slots(&edges, node_id, PortDirection::Output) {
                let mut slot_edges: Vec<ConnectedEdge> =
                    slot.iter().map(|&i| edges[i].clone()).collect();
                node.push(&mut slot_edges, ctx)?;
                for (&i, edge) in slot.iter().zip(slot_edges) {
                    edges[i].value = edge.value;
                }
            }

            node.end_pass();

            report.processed.push(node_id.clone());
            ctx.emit(GraphEvent::NodeProcessed {
                graph_id: self.graph.id.clone(),
                node_id: node_id.clone(),
                node_type: node.node_type().to_string(),
            });
        }

        report.edge_values = edges
            .into_iter()
            .filter_map(|e| e.value.map(|v| (e.id, v)))
            .collect();
        Ok(())
    }

    /// Drop per-pass state on every node
    fn reset_nodes(&mut self) {
        for node in &mut self.nodes {
            node.end_pass();
        }
    }

    /// Resolve every persisted edge against the ports nodes report now
    fn connect_edges(
        &self,
        ctx: &EvaluationContext,
        report: &mut EvaluationReport,
    ) -> Result<Vec<ConnectedEdge>> {
        let mut connected = Vec::with_capacity(self.graph.edges.len());

        for edge in &self.graph.edges {
            let source_port = self.find_port(&edge.source, &edge.source_handle, PortDirection::Output);
            let target_port = self.find_port(&edge.target, &edge.target_handle, PortDirection::Input);

            let missing = match (&source_port, &target_port) {
                (Some(_), Some(_)) => None,
                (None, _) => Some(format!("{}.{}", edge.source, edge.source_handle)),
                (_, None) => Some(format!("{}.{}", edge.target, edge.target_handle)),
            };

            if let Some(port) = missing {
                match ctx.config().unresolved_edges {
                    UnresolvedEdgePolicy::Error => {
                        return Err(SubgraphError::UnresolvedPort {
                            edge_id: edge.id.clone(),
                            port,
                        });
                    }
                    UnresolvedEdgePolicy::Skip => {
                        log::warn!("Skipping edge '{}': no port '{}'", edge.id, port);
                        report.skipped_edges.push(edge.id.clone());
                        ctx.emit(GraphEvent::EdgeSkipped {
                            graph_id: self.graph.id.clone(),
                            edge_id: edge.id.clone(),
                            port,
                        });
                        continue;
                    }
                }
            }

            connected.push(ConnectedEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                source_port,
                target: edge.target.clone(),
                target_port,
                value: None,
            });
        }

        Ok(connected)
    }

    fn find_port(&self, node_id: &str, handle: &str, direction: PortDirection) -> Option<PortDescriptor> {
        let node = self.nodes.iter().find(|n| n.id() == node_id)?;
        let ports = match direction {
            PortDirection::Input => node.input_ports(),
            PortDirection::Output => node.output_ports(),
        };
        ports.into_iter().find(|p| p.identifier == handle)
    }
}

/// Group the edges touching one side of a node by port, preserving
/// connection order within each slot.
fn port_slots(edges: &[ConnectedEdge], node_id: &str, direction: PortDirection) -> Vec<Vec<usize>> {
    let mut slots: Vec<(&str, Vec<usize>)> = Vec::new();

    for (i, edge) in edges.iter().enumerate() {
        let port = match direction {
            PortDirection::Input if edge.target == node_id => edge.target_port.as_ref(),
            PortDirection::Output if edge.source == node_id => edge.source_port.as_ref(),
            _ => None,
        };
        let Some(port) = port else { continue };

        match slots.iter_mut().find(|(id, _)| *id == port.identifier) {
            Some((_, indices)) => indices.push(i),
            None => slots.push((port.identifier.as_str(), vec![i])),
        }
    }

    slots.into_iter().map(|(_, indices)| indices).collect()
}
