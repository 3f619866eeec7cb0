//! The node that embeds a subgraph definition in a parent graph
//!
//! A proxy's ports are generated from its definition's reference lists each
//! time they are asked for. Values crossing the proxy are held in a
//! per-instance pass-through buffer keyed by the reference each connected
//! port structurally matches; the buffer is filled by pull, consumed by the
//! invocation and cleared at the end of the pass.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::buffer::PassThroughBuffer;
use crate::definition::{SharedDefinition, SubgraphDefinition};
use crate::descriptor::{PortDescriptor, PortDirection};
use crate::engine::{ConnectedEdge, EvaluationContext, Node};
use crate::error::Result;
use crate::events::PortsSubscription;
use crate::invocation::SubgraphInvocation;
use crate::port_reference::{resolve_reference, PortReference};
use crate::registry::NodeFactory;
use crate::types::GraphNode;

/// Node type of the subgraph proxy
pub const PROXY_NODE_TYPE: &str = "subgraph";

/// State reachable from the schema-changed listener
#[derive(Debug, Default)]
struct ProxyState {
    buffer: PassThroughBuffer,
    revision: u64,
}

impl ProxyState {
    fn regenerate(&mut self) {
        self.buffer.clear();
        self.revision += 1;
    }
}

/// A subgraph instance placed in a parent graph
///
/// The definition is held weakly: it is an asset shared by every embedding
/// and owned by the library.
pub struct SubgraphProxyNode {
    id: String,
    definition: Weak<RwLock<SubgraphDefinition>>,
    definition_id: Option<String>,
    state: Arc<Mutex<ProxyState>>,
    subscription: Option<PortsSubscription>,
    pass_outputs: Option<PassThroughBuffer>,
}

impl SubgraphProxyNode {
    pub fn new(id: impl Into<String>, definition: &SharedDefinition) -> Self {
        let definition_id = definition.read_recursive().id.clone();
        Self {
            id: id.into(),
            definition: Arc::downgrade(definition),
            definition_id: Some(definition_id),
            state: Arc::new(Mutex::new(ProxyState::default())),
            subscription: None,
            pass_outputs: None,
        }
    }

    /// A proxy with no definition: no ports, pull and push do nothing
    pub fn unbound(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            definition: Weak::new(),
            definition_id: None,
            state: Arc::new(Mutex::new(ProxyState::default())),
            subscription: None,
            pass_outputs: None,
        }
    }

    pub fn definition(&self) -> Option<SharedDefinition> {
        self.definition.upgrade()
    }

    pub fn definition_id(&self) -> Option<&str> {
        self.definition_id.as_deref()
    }

    /// Snapshot of the pass-through buffer
    pub fn buffer(&self) -> PassThroughBuffer {
        self.state.lock().buffer.clone()
    }

    /// Bumped every time the ports are regenerated
    pub fn ports_revision(&self) -> u64 {
        self.state.lock().revision
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Input descriptors, one per input reference, built as iterated
    pub fn generate_input_descriptors(&self) -> impl Iterator<Item = PortDescriptor> {
        self.references(PortDirection::Input)
            .into_iter()
            .map(|r| r.to_descriptor(PortDirection::Input))
    }

    /// Output descriptors, one per output reference
    pub fn generate_output_descriptors(&self) -> impl Iterator<Item = PortDescriptor> {
        self.references(PortDirection::Output)
            .into_iter()
            .map(|r| r.to_descriptor(PortDirection::Output))
    }

    fn references(&self, direction: PortDirection) -> Vec<PortReference> {
        let Some(shared) = self.definition() else {
            return Vec::new();
        };
        let definition = shared.read_recursive();
        match direction {
            PortDirection::Input => definition.input_refs().to_vec(),
            PortDirection::Output => definition.output_refs().to_vec(),
        }
    }

    /// Store the first connected edge's value under its matching reference.
    ///
    /// Further edges on the same slot are ignored. An edge carrying no value
    /// leaves the slot empty.
    pub fn pull_ingress(&mut self, edges: &[ConnectedEdge]) -> Result<()> {
        let Some(first) = edges.first() else {
            return Ok(());
        };
        if edges.len() > 1 {
            log::debug!(
                "Proxy '{}': ignoring {} extra edges after '{}'",
                self.id,
                edges.len() - 1,
                first.id
            );
        }
        let Some(shared) = self.definition() else {
            return Ok(());
        };

        let definition = shared.read_recursive();
        let Some(key) = resolve_reference(definition.input_refs(), first.target_port.as_ref(), PortDirection::Input)?
        else {
            log::debug!("Proxy '{}': no input reference matches edge '{}'", self.id, first.id);
            return Ok(());
        };
        let mut state = self.state.lock();
        match &first.value {
            Some(value) => {
                state.buffer.insert(key.clone(), value.clone());
            }
            // A slot whose edge carries nothing has no value this pass
            None => {
                state.buffer.remove(key);
            }
        }
        Ok(())
    }

    /// Write the invocation's value for this slot onto every connected edge.
    ///
    /// Edges are left untouched when the invocation produced no value for
    /// the slot's reference.
    pub fn push_egress(&mut self, edges: &mut [ConnectedEdge], ctx: &mut EvaluationContext) -> Result<()> {
        let Some(first) = edges.first() else {
            return Ok(());
        };
        let Some(shared) = self.definition() else {
            return Ok(());
        };

        let key = {
            let definition = shared.read_recursive();
            resolve_reference(definition.output_refs(), first.source_port.as_ref(), PortDirection::Output)?
                .cloned()
        };
        let Some(key) = key else {
            log::debug!("Proxy '{}': no output reference matches edge '{}'", self.id, first.id);
            return Ok(());
        };

        if self.pass_outputs.is_none() {
            self.pass_outputs = Some(self.invoke(ctx)?);
        }
        let value = self.pass_outputs.as_ref().and_then(|outputs| outputs.get(&key)).cloned();

        match value {
            Some(value) => {
                for edge in edges.iter_mut() {
                    edge.value = Some(value.clone());
                }
            }
            None => log::debug!("Proxy '{}': no value for output '{}'", self.id, key.label()),
        }
        Ok(())
    }

    fn invoke(&self, ctx: &mut EvaluationContext) -> Result<PassThroughBuffer> {
        let inputs = self.state.lock().buffer.clone();
        match self.definition() {
            Some(shared) => {
                let definition = shared.read_recursive();
                SubgraphInvocation::run(Some(&definition), &inputs, ctx)
            }
            None => SubgraphInvocation::run(None, &inputs, ctx),
        }
    }
}

impl Node for SubgraphProxyNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        PROXY_NODE_TYPE
    }

    /// Clear the buffer and (re)subscribe to the definition's schema changes
    fn initialize_ports(&mut self) {
        // Drop the old guard first so a re-init never leaves two listeners
        self.subscription = None;
        self.pass_outputs = None;

        let Some(shared) = self.definition() else {
            self.state.lock().regenerate();
            return;
        };

        let definition = shared.read_recursive();
        let state = Arc::downgrade(&self.state);
        let node_id = self.id.clone();
        self.subscription = Some(definition.subscribe_scoped(move |changed| {
            let Some(state) = state.upgrade() else {
                return;
            };
            state.lock().regenerate();
            log::debug!(
                "Proxy '{}' regenerated ports from '{}': {} inputs, {} outputs",
                node_id,
                changed.id,
                changed.input_refs().len(),
                changed.output_refs().len()
            );
        }));
        self.state.lock().regenerate();
    }

    fn input_ports(&self) -> Vec<PortDescriptor> {
        self.generate_input_descriptors().collect()
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        self.generate_output_descriptors().collect()
    }

    fn pull(&mut self, edges: &[ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        self.pull_ingress(edges)
    }

    fn process(&mut self, ctx: &mut EvaluationContext) -> Result<()> {
        self.pass_outputs = Some(self.invoke(ctx)?);
        Ok(())
    }

    fn push(&mut self, edges: &mut [ConnectedEdge], ctx: &mut EvaluationContext) -> Result<()> {
        self.push_egress(edges, ctx)
    }

    fn end_pass(&mut self) {
        self.state.lock().buffer.clear();
        self.pass_outputs = None;
    }
}

/// Builds proxies from `data.definitionId`, resolved in the context's library
pub struct ProxyNodeFactory;

impl NodeFactory for ProxyNodeFactory {
    fn create_node(&self, node: &GraphNode, ctx: &EvaluationContext) -> Result<Box<dyn Node>> {
        let definition_id = node.data.get("definitionId").and_then(|v| v.as_str());

        let proxy = match definition_id.and_then(|id| ctx.library().get(id)) {
            Some(definition) => SubgraphProxyNode::new(node.id.clone(), &definition),
            None => {
                log::warn!(
                    "Subgraph node '{}' references unknown definition {:?}",
                    node.id,
                    definition_id
                );
                SubgraphProxyNode::unbound(node.id.clone())
            }
        };
        Ok(Box::new(proxy))
    }
}
