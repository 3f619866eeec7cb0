//! Port descriptors and node type metadata
//!
//! A `PortDescriptor` describes the shape of one port as it exists during a
//! single evaluation pass. Descriptors are regenerated whenever a node's
//! ports are recomputed and are never persisted, so two passes never share
//! descriptor instances; identity across passes is structural.

use serde::{Deserialize, Serialize};

use crate::types::{NodeCategory, PortDataType, PortId};

/// Whether a port receives or produces values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// How many edges a port accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortMultiplicity {
    #[default]
    Single,
    Multiple,
}

/// How a port is laid out on its node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortLayout {
    #[default]
    Horizontal,
    Vertical,
}

/// Description of one port for a single evaluation pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescriptor {
    /// Port identifier, used as the edge handle
    pub identifier: PortId,
    /// Human-readable label
    pub display_name: String,
    /// Data type carried by the port
    pub data_type: PortDataType,
    /// Input or output
    pub direction: PortDirection,
    /// Single or multiple edges
    pub multiplicity: PortMultiplicity,
    /// Horizontal or vertical placement
    pub layout: PortLayout,
    /// Whether the value can be edited inline on the node
    pub inline_editable: bool,
}

impl PortDescriptor {
    /// Create a descriptor with an empty identifier
    pub fn new(
        display_name: impl Into<String>,
        data_type: PortDataType,
        direction: PortDirection,
    ) -> Self {
        Self {
            identifier: String::new(),
            display_name: display_name.into(),
            data_type,
            direction,
            multiplicity: PortMultiplicity::Single,
            layout: PortLayout::Horizontal,
            inline_editable: false,
        }
    }

    /// Create an input port with an explicit identifier
    pub fn input(id: impl Into<String>, label: impl Into<String>, data_type: PortDataType) -> Self {
        Self::new(label, data_type, PortDirection::Input).with_identifier(id)
    }

    /// Create an output port with an explicit identifier
    pub fn output(id: impl Into<String>, label: impl Into<String>, data_type: PortDataType) -> Self {
        Self::new(label, data_type, PortDirection::Output).with_identifier(id)
    }

    /// Set the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Set this port to accept multiple connections
    pub fn multiple(mut self) -> Self {
        self.multiplicity = PortMultiplicity::Multiple;
        self
    }

    /// Lay this port out vertically
    pub fn vertical(mut self) -> Self {
        self.layout = PortLayout::Vertical;
        self
    }

    /// Allow inline editing of the port value
    pub fn inline_editable(mut self) -> Self {
        self.inline_editable = true;
        self
    }

    /// Whether the port accepts multiple connections
    pub fn accepts_multiple(&self) -> bool {
        self.multiplicity == PortMultiplicity::Multiple
    }

    /// Whether the port is laid out vertically
    pub fn is_vertical(&self) -> bool {
        self.layout == PortLayout::Vertical
    }

    /// Default an empty identifier to the display name.
    ///
    /// Returns true if the identifier was assigned by this call.
    pub fn ensure_identifier(&mut self) -> bool {
        if !self.identifier.is_empty() {
            return false;
        }
        self.identifier = self.display_name.clone();
        true
    }
}

/// Trait for node types that can describe their metadata
///
/// The node implementation defines both its behavior and its ports, so the
/// registry never needs a separate definition.
pub trait NodeDescriptor {
    /// Get the static metadata for this node type
    fn descriptor() -> NodeMetadata
    where
        Self: Sized;
}

/// Complete metadata for a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Unique type identifier (e.g., "forward")
    pub node_type: String,
    /// Category for UI grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the node does
    pub description: String,
    /// Static input ports (empty for nodes with dynamic ports)
    pub inputs: Vec<PortDescriptor>,
    /// Static output ports (empty for nodes with dynamic ports)
    pub outputs: Vec<PortDescriptor>,
}

impl NodeMetadata {
    /// Metadata for a node type with no static ports
    pub fn dynamic(
        node_type: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category,
            label: label.into(),
            description: description.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}
