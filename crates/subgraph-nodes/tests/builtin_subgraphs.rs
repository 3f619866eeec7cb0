//! Subgraphs built from the built-in node types

use std::sync::Arc;

use subgraph_engine::{
    validate_definition, DefinitionLibrary, EvaluationContext, GraphEdge, GraphNode, GraphRuntime,
    NodeDescriptor, NodeGraph, NodeMetadata, NodeRegistry, PortDataType, PortReference,
    SubgraphDefinition, PROXY_NODE_TYPE,
};
use subgraph_nodes::{ConcatNode, ConditionalNode, ConstantNode, ForwardNode};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn node(id: &str, metadata: NodeMetadata) -> GraphNode {
    GraphNode::new(id, metadata.node_type)
}

fn constant(id: &str, value: serde_json::Value) -> GraphNode {
    node(id, ConstantNode::descriptor()).with_data(serde_json::json!({ "value": value }))
}

/// Greeting definition: Name -> concat("Hello, ", Name) -> Greeting
fn greeting_definition() -> SubgraphDefinition {
    let mut def = SubgraphDefinition::new("greet", "Greeting");
    def.add_ingress_port(PortReference::new("Name", PortDataType::String));
    def.add_egress_port(PortReference::new("Greeting", PortDataType::String));
    def.initialize();

    def.add_node(constant("prefix", serde_json::json!("Hello"))).unwrap();
    def.add_node(node("join", ConcatNode::descriptor()).with_data(serde_json::json!({"separator": ", "})))
        .unwrap();

    let ingress = def.ingress_node().unwrap().id.clone();
    let egress = def.egress_node().unwrap().id.clone();
    def.connect(GraphEdge::new("g1", "prefix", "value", "join", "a")).unwrap();
    def.connect(GraphEdge::new("g2", ingress, "Name", "join", "b")).unwrap();
    def.connect(GraphEdge::new("g3", "join", "text", egress, "Greeting")).unwrap();
    def
}

/// Router definition: routes Value to Yes or No depending on Flag
fn router_definition() -> SubgraphDefinition {
    let mut def = SubgraphDefinition::new("route", "Router");
    def.add_ingress_port(PortReference::new("Flag", PortDataType::Boolean));
    def.add_ingress_port(PortReference::new("Value", PortDataType::Any));
    def.add_egress_port(PortReference::new("Yes", PortDataType::Any));
    def.add_egress_port(PortReference::new("No", PortDataType::Any));
    def.initialize();
    def.add_node(node("cond", ConditionalNode::descriptor())).unwrap();

    let ingress = def.ingress_node().unwrap().id.clone();
    let egress = def.egress_node().unwrap().id.clone();
    def.connect(GraphEdge::new("r1", ingress.clone(), "Flag", "cond", "condition"))
        .unwrap();
    def.connect(GraphEdge::new("r2", ingress, "Value", "cond", "value")).unwrap();
    def.connect(GraphEdge::new("r3", "cond", "true_out", egress.clone(), "Yes"))
        .unwrap();
    def.connect(GraphEdge::new("r4", "cond", "false_out", egress, "No")).unwrap();
    def
}

fn context(library: &Arc<DefinitionLibrary>) -> EvaluationContext {
    EvaluationContext::new(Arc::new(NodeRegistry::with_builtins()), library.clone())
}

fn proxy(id: &str, definition_id: &str) -> GraphNode {
    GraphNode::new(id, PROXY_NODE_TYPE).with_data(serde_json::json!({ "definitionId": definition_id }))
}

#[test]
fn test_builtin_definitions_validate() {
    let registry = NodeRegistry::with_builtins();
    for def in [greeting_definition(), router_definition()] {
        let errors = validate_definition(&def, Some(&registry));
        assert!(errors.is_empty(), "{}: {:?}", def.id, errors);
    }
}

#[test]
fn test_greeting_through_proxy() {
    init_logging();
    let library = Arc::new(DefinitionLibrary::new());
    library.insert(greeting_definition()).unwrap();
    let mut ctx = context(&library);

    let mut graph = NodeGraph::new("parent", "Parent");
    graph.nodes.push(constant("name", serde_json::json!("Ada")));
    graph.nodes.push(proxy("greet", "greet"));
    graph.nodes.push(node("out", ForwardNode::descriptor()));
    graph.edges.push(GraphEdge::new("e1", "name", "value", "greet", "Name"));
    graph.edges.push(GraphEdge::new("e2", "greet", "Greeting", "out", "value"));

    let mut runtime = GraphRuntime::instantiate(graph, &ctx).unwrap();
    let report = runtime.evaluate(&mut ctx).unwrap();
    assert_eq!(report.edge_value("e2"), Some(&serde_json::json!("Hello, Ada")));
}

#[test]
fn test_router_leaves_untaken_branch_empty() {
    init_logging();
    let library = Arc::new(DefinitionLibrary::new());
    library.insert(router_definition()).unwrap();
    let mut ctx = context(&library);

    let mut graph = NodeGraph::new("parent", "Parent");
    graph.nodes.push(constant("flag", serde_json::json!(false)));
    graph.nodes.push(constant("value", serde_json::json!(5)));
    graph.nodes.push(proxy("router", "route"));
    graph.nodes.push(node("yes", ForwardNode::descriptor()));
    graph.nodes.push(node("no", ForwardNode::descriptor()));
    graph.edges.push(GraphEdge::new("f", "flag", "value", "router", "Flag"));
    graph.edges.push(GraphEdge::new("v", "value", "value", "router", "Value"));
    graph.edges.push(GraphEdge::new("y", "router", "Yes", "yes", "value"));
    graph.edges.push(GraphEdge::new("n", "router", "No", "no", "value"));

    let mut runtime = GraphRuntime::instantiate(graph, &ctx).unwrap();
    let report = runtime.evaluate(&mut ctx).unwrap();
    assert_eq!(report.edge_value("n"), Some(&serde_json::json!(5)));
    assert_eq!(report.edge_value("y"), None);
}

#[test]
fn test_definition_loaded_from_json() {
    init_logging();
    let json = greeting_definition().to_json().unwrap();
    let loaded = SubgraphDefinition::from_json(&json).unwrap();
    assert!(validate_definition(&loaded, Some(&NodeRegistry::with_builtins())).is_empty());

    let library = Arc::new(DefinitionLibrary::new());
    library.insert(loaded).unwrap();
    let mut ctx = context(&library);

    let mut graph = NodeGraph::new("parent", "Parent");
    graph.nodes.push(constant("name", serde_json::json!("Bob")));
    graph.nodes.push(proxy("greet", "greet"));
    graph.nodes.push(node("out", ForwardNode::descriptor()));
    graph.edges.push(GraphEdge::new("e1", "name", "value", "greet", "Name"));
    graph.edges.push(GraphEdge::new("e2", "greet", "Greeting", "out", "value"));

    let mut runtime = GraphRuntime::instantiate(graph, &ctx).unwrap();
    let report = runtime.evaluate(&mut ctx).unwrap();
    assert_eq!(report.edge_value("e2"), Some(&serde_json::json!("Hello, Bob")));
}
