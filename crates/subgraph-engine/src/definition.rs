//! Subgraph definitions
//!
//! A `SubgraphDefinition` is a reusable sub-network packaged behind a
//! declared port schema. It owns the ordered input/output reference lists,
//! the node collection of the sub-network, and the schema-changed notifier
//! proxy nodes subscribe to.
//!
//! The Ingress/Egress boundary nodes live in the node collection like any
//! other node. Their IDs are cached on the definition and kept in step with
//! every add/remove, so at most one of each kind can exist.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::{PortDescriptor, PortDirection};
use crate::error::{Result, SubgraphError};
use crate::events::{PortsSubscription, SchemaNotifier, SubscriptionId};
use crate::port_reference::PortReference;
use crate::types::{GraphEdge, GraphNode, NodeGraph, NodeId};

/// Node type of the boundary node feeding external inputs into a subgraph
pub const INGRESS_NODE_TYPE: &str = "subgraph-ingress";

/// Node type of the boundary node collecting a subgraph's outputs
pub const EGRESS_NODE_TYPE: &str = "subgraph-egress";

/// A definition shared between the library and every proxy embedding it
pub type SharedDefinition = Arc<RwLock<SubgraphDefinition>>;

/// A reusable sub-network with a declared port schema
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphDefinition {
    /// Unique identifier, used by proxy nodes to find the definition
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(default)]
    input_refs: Vec<PortReference>,
    #[serde(default)]
    output_refs: Vec<PortReference>,
    #[serde(default)]
    graph: NodeGraph,
    #[serde(skip)]
    ingress_id: Option<NodeId>,
    #[serde(skip)]
    egress_id: Option<NodeId>,
    #[serde(skip)]
    notifier: Arc<SchemaNotifier>,
}

impl SubgraphDefinition {
    /// Create an empty definition
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            graph: NodeGraph::new(id.clone(), name.clone()),
            id,
            name,
            input_refs: Vec::new(),
            output_refs: Vec::new(),
            ingress_id: None,
            egress_id: None,
            notifier: Arc::new(SchemaNotifier::new()),
        }
    }

    /// Load a definition from JSON.
    ///
    /// Boundary references are rebuilt from the node collection and
    /// `initialize` runs once, as for any definition load.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut definition: Self = serde_json::from_str(json)?;
        definition.reindex_boundaries()?;
        definition.initialize();
        Ok(definition)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn input_refs(&self) -> &[PortReference] {
        &self.input_refs
    }

    pub fn output_refs(&self) -> &[PortReference] {
        &self.output_refs
    }

    /// Append an input reference. Boundary nodes are not touched until
    /// `initialize` runs.
    pub fn add_ingress_port(&mut self, reference: PortReference) {
        self.input_refs.push(reference);
    }

    /// Append an output reference
    pub fn add_egress_port(&mut self, reference: PortReference) {
        self.output_refs.push(reference);
    }

    /// Remove the input reference at `index`
    pub fn remove_ingress_port(&mut self, index: usize) -> Result<PortReference> {
        remove_reference(&mut self.input_refs, index, "input")
    }

    /// Remove the output reference at `index`
    pub fn remove_egress_port(&mut self, index: usize) -> Result<PortReference> {
        remove_reference(&mut self.output_refs, index, "output")
    }

    pub fn clear_ingress_ports(&mut self) {
        self.input_refs.clear();
    }

    pub fn clear_egress_ports(&mut self) {
        self.output_refs.clear();
    }

    /// Bring the boundary nodes in line with the reference lists.
    ///
    /// Creates an Ingress node when there are input references and none
    /// exists, and removes it (with its edges) when the list is empty. Same
    /// for Egress. Idempotent; returns true if the node collection changed.
    pub fn initialize(&mut self) -> bool {
        let ingress = sync_boundary(
            &mut self.graph,
            &mut self.ingress_id,
            INGRESS_NODE_TYPE,
            !self.input_refs.is_empty(),
            (-200.0, 0.0),
        );
        let egress = sync_boundary(
            &mut self.graph,
            &mut self.egress_id,
            EGRESS_NODE_TYPE,
            !self.output_refs.is_empty(),
            (200.0, 0.0),
        );
        ingress || egress
    }

    /// Add a node to the sub-network
    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if self.graph.contains_node(&node.id) {
            return Err(SubgraphError::InvalidArgument(format!(
                "node '{}' already exists in '{}'",
                node.id, self.id
            )));
        }

        let slot = match node.node_type.as_str() {
            INGRESS_NODE_TYPE => Some(&mut self.ingress_id),
            EGRESS_NODE_TYPE => Some(&mut self.egress_id),
            _ => None,
        };
        if let Some(slot) = slot {
            if slot.is_some() {
                return Err(SubgraphError::BoundaryConflict {
                    definition_id: self.id.clone(),
                    kind: boundary_kind_name(&node.node_type).to_string(),
                });
            }
            *slot = Some(node.id.clone());
        }

        self.graph.nodes.push(node);
        Ok(())
    }

    /// Remove a node and its edges
    pub fn remove_node(&mut self, node_id: &str) -> Option<GraphNode> {
        let removed = self.graph.remove_node(node_id)?;
        if self.ingress_id.as_deref() == Some(node_id) {
            self.ingress_id = None;
        }
        if self.egress_id.as_deref() == Some(node_id) {
            self.egress_id = None;
        }
        Some(removed)
    }

    /// Connect two nodes of the sub-network
    pub fn connect(&mut self, edge: GraphEdge) -> Result<()> {
        for node_id in [&edge.source, &edge.target] {
            if !self.graph.contains_node(node_id) {
                return Err(SubgraphError::NodeNotFound(node_id.clone()));
            }
        }
        if self.graph.edges.iter().any(|e| e.id == edge.id) {
            return Err(SubgraphError::InvalidArgument(format!(
                "edge '{}' already exists in '{}'",
                edge.id, self.id
            )));
        }
        self.graph.edges.push(edge);
        Ok(())
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn ingress_node(&self) -> Option<&GraphNode> {
        self.ingress_id.as_deref().and_then(|id| self.graph.find_node(id))
    }

    pub fn egress_node(&self) -> Option<&GraphNode> {
        self.egress_id.as_deref().and_then(|id| self.graph.find_node(id))
    }

    /// Output ports of the Ingress node, one per input reference
    pub fn ingress_descriptors(&self) -> Vec<PortDescriptor> {
        self.input_refs
            .iter()
            .map(|r| r.to_descriptor(PortDirection::Output))
            .collect()
    }

    /// Input ports of the Egress node, one per output reference
    pub fn egress_descriptors(&self) -> Vec<PortDescriptor> {
        self.output_refs
            .iter()
            .map(|r| r.to_descriptor(PortDirection::Input))
            .collect()
    }

    /// Tell every subscriber the port schema changed.
    ///
    /// Synchronous, in subscription order, once per call.
    pub fn notify_ports_changed(&self) {
        log::debug!(
            "Definition '{}' ports changed, notifying {} subscribers",
            self.id,
            self.notifier.listener_count()
        );
        self.notifier.notify(self);
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&SubgraphDefinition) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Subscribe for as long as the returned guard lives
    pub fn subscribe_scoped(
        &self,
        listener: impl Fn(&SubgraphDefinition) + Send + Sync + 'static,
    ) -> PortsSubscription {
        let id = self.notifier.subscribe(listener);
        PortsSubscription::new(&self.notifier, id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.listener_count()
    }

    /// Rebuild the cached boundary IDs from the node collection
    pub fn reindex_boundaries(&mut self) -> Result<()> {
        self.ingress_id = None;
        self.egress_id = None;

        for node in &self.graph.nodes {
            let slot = match node.node_type.as_str() {
                INGRESS_NODE_TYPE => &mut self.ingress_id,
                EGRESS_NODE_TYPE => &mut self.egress_id,
                _ => continue,
            };
            if slot.is_some() {
                return Err(SubgraphError::BoundaryConflict {
                    definition_id: self.id.clone(),
                    kind: boundary_kind_name(&node.node_type).to_string(),
                });
            }
            *slot = Some(node.id.clone());
        }
        Ok(())
    }

    /// Take the schema and sub-network of `other`, keeping this
    /// definition's subscribers.
    pub fn replace_schema(&mut self, other: SubgraphDefinition) {
        self.name = other.name;
        self.input_refs = other.input_refs;
        self.output_refs = other.output_refs;
        self.graph = other.graph;
        self.ingress_id = other.ingress_id;
        self.egress_id = other.egress_id;
    }

    pub fn into_shared(self) -> SharedDefinition {
        Arc::new(RwLock::new(self))
    }
}

fn remove_reference(
    references: &mut Vec<PortReference>,
    index: usize,
    side: &str,
) -> Result<PortReference> {
    if index >= references.len() {
        return Err(SubgraphError::InvalidArgument(format!(
            "{} port index {} out of range ({} ports)",
            side,
            index,
            references.len()
        )));
    }
    Ok(references.remove(index))
}

fn sync_boundary(
    graph: &mut NodeGraph,
    cached: &mut Option<NodeId>,
    node_type: &str,
    wanted: bool,
    position: (f64, f64),
) -> bool {
    match (wanted, cached.as_ref()) {
        (true, None) => {
            let id = format!("{}-{}", node_type, Uuid::new_v4());
            log::debug!("Creating boundary node '{}' in '{}'", id, graph.id);
            graph
                .nodes
                .push(GraphNode::new(id.clone(), node_type).with_position(position.0, position.1));
            *cached = Some(id);
            true
        }
        (false, Some(id)) => {
            log::debug!("Removing boundary node '{}' from '{}'", id, graph.id);
            graph.remove_node(id);
            *cached = None;
            true
        }
        _ => false,
    }
}

fn boundary_kind_name(node_type: &str) -> &'static str {
    if node_type == INGRESS_NODE_TYPE {
        "ingress"
    } else {
        "egress"
    }
}
