//! Ingress and Egress boundary nodes
//!
//! Boundary nodes materialize a definition's external schema inside the
//! sub-network. Their per-call values live in a `BoundaryFrame` owned by
//! the invocation, never on the shared definition, so two invocations of
//! the same definition cannot see each other's values.
//!
//! Per invocation the frame moves `Idle -> Seeded -> Evaluated -> Collected`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::PassThroughBuffer;
use crate::definition::{EGRESS_NODE_TYPE, INGRESS_NODE_TYPE};
use crate::descriptor::{PortDescriptor, PortDirection};
use crate::engine::{ConnectedEdge, EvaluationContext, Node};
use crate::error::Result;
use crate::port_reference::{resolve_reference, PortReference};

/// Which side of the subgraph a boundary node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Ingress,
    Egress,
}

impl BoundaryKind {
    pub fn node_type(self) -> &'static str {
        match self {
            BoundaryKind::Ingress => INGRESS_NODE_TYPE,
            BoundaryKind::Egress => EGRESS_NODE_TYPE,
        }
    }

    pub fn from_node_type(node_type: &str) -> Option<Self> {
        match node_type {
            INGRESS_NODE_TYPE => Some(BoundaryKind::Ingress),
            EGRESS_NODE_TYPE => Some(BoundaryKind::Egress),
            _ => None,
        }
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryKind::Ingress => write!(f, "ingress"),
            BoundaryKind::Egress => write!(f, "egress"),
        }
    }
}

/// Where an invocation's boundary values are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryPhase {
    #[default]
    Idle,
    Seeded,
    Evaluated,
    Collected,
}

/// Call-local state shared by one invocation's boundary nodes
#[derive(Debug, Default)]
pub struct BoundaryFrame {
    phase: BoundaryPhase,
    seeded: PassThroughBuffer,
    collected: PassThroughBuffer,
}

/// Frame handle shared between an invocation and its boundary nodes
pub type SharedFrame = Arc<Mutex<BoundaryFrame>>;

impl BoundaryFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedFrame {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn phase(&self) -> BoundaryPhase {
        self.phase
    }

    /// Inject the values the Ingress node will emit
    pub fn seed(&mut self, inputs: PassThroughBuffer) {
        self.seeded = inputs;
        self.collected.clear();
        self.phase = BoundaryPhase::Seeded;
    }

    pub fn seeded_value(&self, key: &PortReference) -> Option<&serde_json::Value> {
        self.seeded.get(key)
    }

    /// Record a value arriving at the Egress node
    pub fn collect(&mut self, key: PortReference, value: serde_json::Value) {
        self.collected.insert(key, value);
    }

    pub fn mark_evaluated(&mut self) {
        self.phase = BoundaryPhase::Evaluated;
    }

    /// Hand over everything collected, leaving the frame empty
    pub fn take_collected(&mut self) -> PassThroughBuffer {
        self.phase = BoundaryPhase::Collected;
        self.seeded.clear();
        std::mem::take(&mut self.collected)
    }
}

/// Emits seeded values on output ports generated from the input references
pub struct IngressNode {
    id: String,
    references: Vec<PortReference>,
    frame: SharedFrame,
}

impl IngressNode {
    pub fn new(id: impl Into<String>, references: Vec<PortReference>, frame: SharedFrame) -> Self {
        Self {
            id: id.into(),
            references,
            frame,
        }
    }
}

impl Node for IngressNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        INGRESS_NODE_TYPE
    }

    fn input_ports(&self) -> Vec<PortDescriptor> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        self.references
            .iter()
            .map(|r| r.to_descriptor(PortDirection::Output))
            .collect()
    }

    fn pull(&mut self, _edges: &[ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, _ctx: &mut EvaluationContext) -> Result<()> {
        Ok(())
    }

    fn push(&mut self, edges: &mut [ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        let Some(first) = edges.first() else {
            return Ok(());
        };
        let Some(key) = resolve_reference(&self.references, first.source_port.as_ref(), PortDirection::Output)?
        else {
            log::debug!("Ingress '{}': no reference matches edge '{}'", self.id, first.id);
            return Ok(());
        };

        // Ports with no seeded value emit nothing
        let Some(value) = self.frame.lock().seeded_value(key).cloned() else {
            return Ok(());
        };
        for edge in edges.iter_mut() {
            edge.value = Some(value.clone());
        }
        Ok(())
    }
}

/// Collects values arriving on input ports generated from the output references
pub struct EgressNode {
    id: String,
    references: Vec<PortReference>,
    frame: SharedFrame,
}

impl EgressNode {
    pub fn new(id: impl Into<String>, references: Vec<PortReference>, frame: SharedFrame) -> Self {
        Self {
            id: id.into(),
            references,
            frame,
        }
    }
}

impl Node for EgressNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        EGRESS_NODE_TYPE
    }

    fn input_ports(&self) -> Vec<PortDescriptor> {
        self.references
            .iter()
            .map(|r| r.to_descriptor(PortDirection::Input))
            .collect()
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        Vec::new()
    }

    fn pull(&mut self, edges: &[ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        let Some(first) = edges.first() else {
            return Ok(());
        };
        if edges.len() > 1 {
            log::debug!(
                "Egress '{}': ignoring {} extra edges after '{}'",
                self.id,
                edges.len() - 1,
                first.id
            );
        }

        let Some(key) = resolve_reference(&self.references, first.target_port.as_ref(), PortDirection::Input)?
        else {
            log::debug!("Egress '{}': no reference matches edge '{}'", self.id, first.id);
            return Ok(());
        };
        if let Some(value) = &first.value {
            self.frame.lock().collect(key.clone(), value.clone());
        }
        Ok(())
    }

    fn process(&mut self, _ctx: &mut EvaluationContext) -> Result<()> {
        Ok(())
    }

    fn push(&mut self, _edges: &mut [ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        Ok(())
    }
}
