//! Node type registry for dynamic node resolution
//!
//! The registry maps node type strings to metadata and to a factory that
//! creates live `Node` instances for the graph runtime. Ordinary node types
//! only provide a `NodeExecutor` (inputs in, outputs out) and are wrapped in
//! an adapter; the subgraph proxy plugs in its own factory.
//!
//! # Usage
//!
//! ```ignore
//! use subgraph_engine::NodeRegistry;
//!
//! let mut registry = NodeRegistry::with_builtins();
//! registry.register_executor(MyNode::descriptor(), Arc::new(MyNode));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{EGRESS_NODE_TYPE, INGRESS_NODE_TYPE};
use crate::descriptor::{NodeMetadata, PortDescriptor};
use crate::engine::{ConnectedEdge, EvaluationContext, Node};
use crate::error::{Result, SubgraphError};
use crate::proxy::{ProxyNodeFactory, PROXY_NODE_TYPE};
use crate::types::{GraphNode, NodeCategory, PortId};

/// Per-node-type executor
///
/// Executors are stateless: everything a node needs arrives in `node`
/// (its configuration) and `inputs` (values keyed by input port id).
pub trait NodeExecutor: Send + Sync {
    fn execute(
        &self,
        node: &GraphNode,
        inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>>;
}

/// Creates live node instances for one node type
pub trait NodeFactory: Send + Sync {
    fn create_node(&self, node: &GraphNode, ctx: &EvaluationContext) -> Result<Box<dyn Node>>;
}

/// Link-time registration of a built-in node type
///
/// Node crates submit one of these per type with `inventory::submit!`;
/// `NodeRegistry::with_builtins` collects them.
pub struct NodeTypeFn {
    pub descriptor: fn() -> NodeMetadata,
    pub executor: fn() -> Arc<dyn NodeExecutor>,
}

inventory::collect!(NodeTypeFn);

/// A registration entry combining metadata with an optional factory
struct RegistryEntry {
    metadata: NodeMetadata,
    factory: Option<Arc<dyn NodeFactory>>,
}

/// Registry of node types with their metadata and factories
///
/// Registries can be composed by merging:
/// ```ignore
/// let mut registry = NodeRegistry::with_core();
/// registry.merge(plugin_registry);
/// ```
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the boundary and proxy node types
    ///
    /// Boundary nodes are metadata-only: they are built by the invocation
    /// that owns their values, never through the registry.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        registry.register_metadata(NodeMetadata::dynamic(
            INGRESS_NODE_TYPE,
            NodeCategory::Boundary,
            "Subgraph Input",
            "Feeds the subgraph's external inputs into the sub-network",
        ));
        registry.register_metadata(NodeMetadata::dynamic(
            EGRESS_NODE_TYPE,
            NodeCategory::Boundary,
            "Subgraph Output",
            "Collects values leaving the sub-network",
        ));
        registry.register(
            NodeMetadata::dynamic(
                PROXY_NODE_TYPE,
                NodeCategory::Subgraph,
                "Subgraph",
                "Embeds a subgraph definition as a single node",
            ),
            Arc::new(ProxyNodeFactory),
        );
        registry
    }

    /// Core types plus every node type submitted through `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::with_core();
        for entry in inventory::iter::<NodeTypeFn> {
            registry.register_executor((entry.descriptor)(), (entry.executor)());
        }
        log::debug!("Registered {} node types", registry.entries.len());
        registry
    }

    /// Register a node type with metadata and a node factory
    pub fn register(&mut self, metadata: NodeMetadata, factory: Arc<dyn NodeFactory>) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                factory: Some(factory),
            },
        );
    }

    /// Register a node type backed by an executor
    pub fn register_executor(&mut self, metadata: NodeMetadata, executor: Arc<dyn NodeExecutor>) {
        let factory = Arc::new(ExecutorNodeFactory {
            metadata: metadata.clone(),
            executor,
        });
        self.register(metadata, factory);
    }

    /// Register a node type using a synchronous callback
    ///
    /// The callback receives (node, inputs) and returns outputs.
    pub fn register_callback<F>(&mut self, metadata: NodeMetadata, callback: F)
    where
        F: Fn(&GraphNode, HashMap<PortId, serde_json::Value>) -> Result<HashMap<PortId, serde_json::Value>>
            + Send
            + Sync
            + 'static,
    {
        self.register_executor(metadata, Arc::new(SyncCallbackNodeExecutor::new(callback)));
    }

    /// Register a node type with metadata only (no factory)
    ///
    /// Used for metadata-only registrations (e.g., palette listing).
    pub fn register_metadata(&mut self, metadata: NodeMetadata) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                factory: None,
            },
        );
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.entries.get(node_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata
    pub fn all_metadata(&self) -> Vec<&NodeMetadata> {
        self.entries.values().map(|e| &e.metadata).collect()
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&NodeMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&NodeMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }
        grouped
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same node_type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }

    /// Instantiate a live node for a graph node
    pub fn create_node(&self, node: &GraphNode, ctx: &EvaluationContext) -> Result<Box<dyn Node>> {
        let factory = self
            .entries
            .get(&node.node_type)
            .and_then(|e| e.factory.as_ref())
            .ok_or_else(|| SubgraphError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
            })?;
        factory.create_node(node, ctx)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous callback-based NodeExecutor
///
/// Wraps a closure, mostly for tests and host-defined node types.
pub struct SyncCallbackNodeExecutor {
    callback: Box<
        dyn Fn(&GraphNode, HashMap<PortId, serde_json::Value>) -> Result<HashMap<PortId, serde_json::Value>>
            + Send
            + Sync,
    >,
}

impl SyncCallbackNodeExecutor {
    pub fn new(
        callback: impl Fn(&GraphNode, HashMap<PortId, serde_json::Value>) -> Result<HashMap<PortId, serde_json::Value>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl NodeExecutor for SyncCallbackNodeExecutor {
    fn execute(
        &self,
        node: &GraphNode,
        inputs: HashMap<PortId, serde_json::Value>,
    ) -> Result<HashMap<PortId, serde_json::Value>> {
        (self.callback)(node, inputs)
    }
}

/// Factory wrapping a shared executor in an `ExecutorNode` per instance
struct ExecutorNodeFactory {
    metadata: NodeMetadata,
    executor: Arc<dyn NodeExecutor>,
}

impl NodeFactory for ExecutorNodeFactory {
    fn create_node(&self, node: &GraphNode, _ctx: &EvaluationContext) -> Result<Box<dyn Node>> {
        Ok(Box::new(ExecutorNode::new(
            node.clone(),
            self.metadata.clone(),
            self.executor.clone(),
        )))
    }
}

/// Adapts a `NodeExecutor` to the pull/process/push protocol
///
/// Ports come from the static metadata. A single-edge port takes the value
/// of its first connected edge; a port declared `Multiple` receives the
/// values of all its edges as a JSON array, in connection order.
pub struct ExecutorNode {
    node: GraphNode,
    metadata: NodeMetadata,
    executor: Arc<dyn NodeExecutor>,
    inputs: HashMap<PortId, serde_json::Value>,
    outputs: HashMap<PortId, serde_json::Value>,
}

impl ExecutorNode {
    pub fn new(node: GraphNode, metadata: NodeMetadata, executor: Arc<dyn NodeExecutor>) -> Self {
        Self {
            node,
            metadata,
            executor,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        }
    }
}

impl Node for ExecutorNode {
    fn id(&self) -> &str {
        &self.node.id
    }

    fn node_type(&self) -> &str {
        &self.node.node_type
    }

    fn input_ports(&self) -> Vec<PortDescriptor> {
        self.metadata.inputs.clone()
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        self.metadata.outputs.clone()
    }

    fn pull(&mut self, edges: &[ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        let Some(port) = edges.first().and_then(|e| e.target_port.as_ref()) else {
            return Ok(());
        };

        let value = if port.accepts_multiple() {
            let values: Vec<serde_json::Value> = edges.iter().filter_map(|e| e.value.clone()).collect();
            Some(serde_json::Value::Array(values))
        } else {
            edges[0].value.clone()
        };
        if let Some(value) = value {
            self.inputs.insert(port.identifier.clone(), value);
        }
        Ok(())
    }

    fn process(&mut self, _ctx: &mut EvaluationContext) -> Result<()> {
        let inputs = std::mem::take(&mut self.inputs);
        log::trace!("Executing node '{}' ({})", self.node.id, self.node.node_type);
        self.outputs = self.executor.execute(&self.node, inputs)?;
        Ok(())
    }

    fn push(&mut self, edges: &mut [ConnectedEdge], _ctx: &mut EvaluationContext) -> Result<()> {
        let Some(port) = edges.first().and_then(|e| e.source_port.as_ref()) else {
            return Ok(());
        };
        let Some(value) = self.outputs.get(&port.identifier).cloned() else {
            return Ok(());
        };
        for edge in edges.iter_mut() {
            edge.value = Some(value.clone());
        }
        Ok(())
    }

    fn end_pass(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }
}
