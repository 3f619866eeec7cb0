//! Subgraph definition validation
//!
//! Checks a definition's schema against its sub-network: duplicate
//! references, boundary node presence, dangling edges, boundary handles
//! that name no reference, port type compatibility and cycles.

use std::collections::HashSet;

use crate::boundary::BoundaryKind;
use crate::definition::SubgraphDefinition;
use crate::descriptor::PortDirection;
use crate::error::SubgraphError;
use crate::registry::NodeRegistry;
use crate::types::{GraphNode, PortDataType};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two references in one list are structurally equal and would share a
    /// buffer slot
    DuplicatePortReference {
        direction: PortDirection,
        label: String,
    },
    /// Two references in one list generate the same port identifier, so
    /// edge handles can only ever reach the first
    DuplicatePortIdentifier {
        direction: PortDirection,
        identifier: String,
    },
    /// The schema declares ports on a side with no boundary node
    MissingBoundaryNode { kind: BoundaryKind },
    /// More than one boundary node of a kind
    MultipleBoundaryNodes { kind: BoundaryKind },
    /// An edge references a non-existent node
    UnknownNode { edge_id: String, node_id: String },
    /// An edge names a boundary port no reference generates
    UnknownBoundaryPort {
        edge_id: String,
        kind: BoundaryKind,
        port: String,
    },
    /// An edge connects incompatible port types
    IncompatiblePortTypes {
        edge_id: String,
        source_type: PortDataType,
        target_type: PortDataType,
    },
    /// Cycle detected in the sub-network
    CycleDetected,
    /// A node has an unknown type (not in registry)
    UnknownNodeType { node_id: String, node_type: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicatePortReference { direction, label } => {
                write!(f, "Duplicate {:?} port reference '{}'", direction, label)
            }
            Self::DuplicatePortIdentifier {
                direction,
                identifier,
            } => {
                write!(f, "Duplicate {:?} port identifier '{}'", direction, identifier)
            }
            Self::MissingBoundaryNode { kind } => {
                write!(f, "Ports are declared but there is no {} node", kind)
            }
            Self::MultipleBoundaryNodes { kind } => {
                write!(f, "Subgraph has multiple {} nodes", kind)
            }
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::UnknownBoundaryPort { edge_id, kind, port } => {
                write!(
                    f,
                    "Edge '{}' references unknown {} port '{}'",
                    edge_id, kind, port
                )
            }
            Self::IncompatiblePortTypes {
                edge_id,
                source_type,
                target_type,
            } => {
                write!(
                    f,
                    "Edge '{}' connects incompatible types: {:?} -> {:?}",
                    edge_id, source_type, target_type
                )
            }
            Self::CycleDetected => write!(f, "Cycle detected in subgraph"),
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "Unknown node type '{}' for node '{}'", node_type, node_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a subgraph definition
///
/// Returns all validation errors found (not just the first).
/// Pass a registry to enable node type and port type validation.
pub fn validate_definition(
    definition: &SubgraphDefinition,
    registry: Option<&NodeRegistry>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_references(definition, &mut errors);
    validate_boundaries(definition, &mut errors);
    validate_edges(definition, registry, &mut errors);

    if let Err(SubgraphError::CycleDetected { .. }) = definition.graph().topological_order() {
        errors.push(ValidationError::CycleDetected);
    }

    if let Some(reg) = registry {
        for node in &definition.graph().nodes {
            if !reg.has_node_type(&node.node_type) {
                errors.push(ValidationError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                });
            }
        }
    }

    errors
}

fn validate_references(definition: &SubgraphDefinition, errors: &mut Vec<ValidationError>) {
    let sides = [
        (PortDirection::Input, definition.input_refs()),
        (PortDirection::Output, definition.output_refs()),
    ];
    for (direction, references) in sides {
        let mut seen = HashSet::new();
        let mut identifiers = HashSet::new();
        for reference in references {
            let identifier = reference.to_descriptor(direction).identifier;
            if !seen.insert(reference) {
                errors.push(ValidationError::DuplicatePortReference {
                    direction,
                    label: reference.label().to_string(),
                });
            } else if !identifiers.insert(identifier.clone()) {
                errors.push(ValidationError::DuplicatePortIdentifier {
                    direction,
                    identifier,
                });
            }
        }
    }
}

fn validate_boundaries(definition: &SubgraphDefinition, errors: &mut Vec<ValidationError>) {
    for kind in [BoundaryKind::Ingress, BoundaryKind::Egress] {
        let count = definition
            .graph()
            .nodes
            .iter()
            .filter(|n| n.node_type == kind.node_type())
            .count();
        let declared = match kind {
            BoundaryKind::Ingress => !definition.input_refs().is_empty(),
            BoundaryKind::Egress => !definition.output_refs().is_empty(),
        };

        if count > 1 {
            errors.push(ValidationError::MultipleBoundaryNodes { kind });
        } else if count == 0 && declared {
            errors.push(ValidationError::MissingBoundaryNode { kind });
        }
    }
}

fn validate_edges(
    definition: &SubgraphDefinition,
    registry: Option<&NodeRegistry>,
    errors: &mut Vec<ValidationError>,
) {
    let graph = definition.graph();

    for edge in &graph.edges {
        let source = graph.find_node(&edge.source);
        let target = graph.find_node(&edge.target);

        for (node, node_id) in [(source, &edge.source), (target, &edge.target)] {
            if node.is_none() {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }
        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };

        let source_type = port_type(
            definition,
            registry,
            source,
            &edge.source_handle,
            PortDirection::Output,
            &edge.id,
            errors,
        );
        let target_type = port_type(
            definition,
            registry,
            target,
            &edge.target_handle,
            PortDirection::Input,
            &edge.id,
            errors,
        );

        if let (Some(source_type), Some(target_type)) = (source_type, target_type) {
            if !source_type.is_compatible_with(&target_type) {
                errors.push(ValidationError::IncompatiblePortTypes {
                    edge_id: edge.id.clone(),
                    source_type,
                    target_type,
                });
            }
        }
    }
}

/// Type of the port an edge handle names, if it can be determined.
///
/// Boundary handles are checked against the generated descriptors and
/// reported when unknown; other handles need registry metadata.
fn port_type(
    definition: &SubgraphDefinition,
    registry: Option<&NodeRegistry>,
    node: &GraphNode,
    handle: &str,
    direction: PortDirection,
    edge_id: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<PortDataType> {
    if let Some(kind) = BoundaryKind::from_node_type(&node.node_type) {
        let ports = match (kind, direction) {
            (BoundaryKind::Ingress, PortDirection::Output) => definition.ingress_descriptors(),
            (BoundaryKind::Egress, PortDirection::Input) => definition.egress_descriptors(),
            _ => Vec::new(),
        };
        let found = ports.iter().find(|p| p.identifier == handle).map(|p| p.data_type);
        if found.is_none() {
            errors.push(ValidationError::UnknownBoundaryPort {
                edge_id: edge_id.to_string(),
                kind,
                port: handle.to_string(),
            });
        }
        return found;
    }

    let metadata = registry?.get_metadata(&node.node_type)?;
    let ports = match direction {
        PortDirection::Input => &metadata.inputs,
        PortDirection::Output => &metadata.outputs,
    };
    ports.iter().find(|p| p.identifier == handle).map(|p| p.data_type)
}
