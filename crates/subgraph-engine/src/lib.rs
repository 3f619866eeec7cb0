//! Subgraph Engine - reusable sub-networks for node-based dataflow graphs
//!
//! A sub-network of processing nodes is packaged behind a declared port
//! schema (`SubgraphDefinition`) and embedded in a parent graph as a single
//! node (`SubgraphProxyNode`). The crate keeps three things consistent:
//!
//! - the schema a definition declares,
//! - the ports each embedding proxy generates from it, and
//! - the values crossing the boundary during one evaluation pass.
//!
//! # Architecture
//!
//! - `PortReference`: persisted schema entry, matched structurally against
//!   freshly generated `PortDescriptor`s on every pass
//! - `SubgraphDefinition`: schema, sub-network and schema-changed notifier
//! - `IngressNode` / `EgressNode`: boundary nodes inside the sub-network
//! - `SubgraphProxyNode`: dynamic ports plus a per-instance pass-through buffer
//! - `SubgraphInvocation`: runs a definition against a buffer, with all
//!   per-call state kept in a call-local `BoundaryFrame`
//! - `GraphRuntime`: the synchronous pull/process/push pass over a graph
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use subgraph_engine::{DefinitionLibrary, EvaluationContext, GraphRuntime, NodeRegistry};
//!
//! let library = Arc::new(DefinitionLibrary::with_persistence(".subgraphs"));
//! library.load_from_disk()?;
//!
//! let mut ctx = EvaluationContext::new(Arc::new(NodeRegistry::with_builtins()), library);
//! let mut runtime = GraphRuntime::instantiate(parent_graph, &ctx)?;
//! let report = runtime.evaluate(&mut ctx)?;
//! ```

pub mod boundary;
pub mod buffer;
pub mod config;
pub mod definition;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod invocation;
pub mod library;
pub mod port_reference;
pub mod proxy;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export key types
pub use boundary::{BoundaryFrame, BoundaryKind, BoundaryPhase, EgressNode, IngressNode};
pub use buffer::PassThroughBuffer;
pub use config::{EvaluationConfig, UnresolvedEdgePolicy};
pub use definition::{SharedDefinition, SubgraphDefinition, EGRESS_NODE_TYPE, INGRESS_NODE_TYPE};
pub use descriptor::{
    NodeDescriptor, NodeMetadata, PortDescriptor, PortDirection, PortLayout, PortMultiplicity,
};
pub use engine::{ConnectedEdge, EvaluationContext, EvaluationReport, GraphRuntime, Node};
pub use error::{Result, SubgraphError};
pub use events::{
    EventError, EventSink, GraphEvent, NullEventSink, PortsSubscription, SchemaNotifier,
    SubscriptionId, VecEventSink,
};
pub use invocation::SubgraphInvocation;
pub use library::{DefinitionLibrary, DefinitionSummary};
pub use port_reference::{resolve_reference, PortReference, DEFAULT_LABEL};
pub use proxy::{ProxyNodeFactory, SubgraphProxyNode, PROXY_NODE_TYPE};
pub use registry::{
    ExecutorNode, NodeExecutor, NodeFactory, NodeRegistry, NodeTypeFn, SyncCallbackNodeExecutor,
};
pub use types::{
    EdgeId, GraphEdge, GraphNode, NodeCategory, NodeGraph, NodeId, PortDataType, PortId,
};
pub use validation::{validate_definition, ValidationError};

