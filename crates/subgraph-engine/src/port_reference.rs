//! Persisted port schema entries and structural matching
//!
//! A `PortReference` is one user-edited entry in a subgraph's port schema.
//! Descriptors generated from it carry no stable ID, so every pass locates
//! the reference behind a port by comparing fields: label against display
//! name, drawer flag against inline editing, display type, layout and
//! multiplicity. The comparison is exact; there is no fuzzy matching.

use serde::{Deserialize, Serialize};

use crate::descriptor::{PortDescriptor, PortDirection, PortLayout, PortMultiplicity};
use crate::error::{Result, SubgraphError};
use crate::types::PortDataType;

/// Label given to references created without one
pub const DEFAULT_LABEL: &str = "LABEL";

/// One exposed port in a subgraph's declared schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortReference {
    label: String,
    show_as_drawer: bool,
    display_type: PortDataType,
    vertical: bool,
    accept_multiple_edges: bool,
}

impl Default for PortReference {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            show_as_drawer: false,
            display_type: PortDataType::Any,
            vertical: false,
            accept_multiple_edges: false,
        }
    }
}

impl PortReference {
    /// Create a reference with the given label and type
    pub fn new(label: impl Into<String>, display_type: PortDataType) -> Self {
        Self {
            label: label.into(),
            display_type,
            ..Self::default()
        }
    }

    /// Render the port value as an inline drawer
    pub fn show_as_drawer(mut self) -> Self {
        self.show_as_drawer = true;
        self
    }

    /// Lay the port out vertically
    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }

    /// Accept multiple edges on the port
    pub fn accept_multiple_edges(mut self) -> Self {
        self.accept_multiple_edges = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shows_as_drawer(&self) -> bool {
        self.show_as_drawer
    }

    pub fn display_type(&self) -> PortDataType {
        self.display_type
    }

    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    pub fn accepts_multiple_edges(&self) -> bool {
        self.accept_multiple_edges
    }

    /// Structural equality against a descriptor
    pub fn matches(&self, descriptor: &PortDescriptor) -> bool {
        self.label == descriptor.display_name
            && self.show_as_drawer == descriptor.inline_editable
            && self.display_type == descriptor.data_type
            && self.vertical == (descriptor.layout == PortLayout::Vertical)
            && self.accept_multiple_edges == (descriptor.multiplicity == PortMultiplicity::Multiple)
    }

    /// Build a fresh descriptor for this reference.
    ///
    /// The identifier defaults to the display name, so a reference always
    /// yields a port whose edge handle is its label.
    pub fn to_descriptor(&self, direction: PortDirection) -> PortDescriptor {
        let mut descriptor = PortDescriptor::new(self.label.clone(), self.display_type, direction);
        if self.show_as_drawer {
            descriptor = descriptor.inline_editable();
        }
        if self.vertical {
            descriptor = descriptor.vertical();
        }
        if self.accept_multiple_edges {
            descriptor = descriptor.multiple();
        }
        if descriptor.ensure_identifier() {
            log::trace!("Port '{}' identifier defaulted to its display name", self.label);
        }
        descriptor
    }

    /// First candidate that is structurally equal to this reference
    pub fn match_in<'a, I>(&self, candidates: I) -> Option<&'a PortDescriptor>
    where
        I: IntoIterator<Item = &'a PortDescriptor>,
    {
        candidates.into_iter().find(|d| self.matches(d))
    }
}

impl PartialEq<PortDescriptor> for PortReference {
    fn eq(&self, other: &PortDescriptor) -> bool {
        self.matches(other)
    }
}

/// Find the reference a connected port was generated from.
///
/// `direction` is the direction the port must have on the node doing the
/// lookup. A missing descriptor or one facing the other way cannot be
/// compared and is rejected; a well-formed descriptor with no structural
/// match yields `Ok(None)`.
pub fn resolve_reference<'a>(
    references: &'a [PortReference],
    descriptor: Option<&PortDescriptor>,
    direction: PortDirection,
) -> Result<Option<&'a PortReference>> {
    let descriptor = descriptor.ok_or_else(|| {
        SubgraphError::invalid("cannot match a port reference against a missing descriptor")
    })?;
    if descriptor.direction != direction {
        return Err(SubgraphError::InvalidArgument(format!(
            "port '{}' is an {:?} port, expected {:?}",
            descriptor.display_name, descriptor.direction, direction
        )));
    }
    Ok(references.iter().find(|r| r.matches(descriptor)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reference() {
        let reference = PortReference::default();
        assert_eq!(reference.label(), DEFAULT_LABEL);
        assert_eq!(reference.display_type(), PortDataType::Any);
        assert!(!reference.shows_as_drawer());
        assert!(!reference.is_vertical());
        assert!(!reference.accepts_multiple_edges());
    }

    #[test]
    fn test_descriptor_round_trips_structurally() {
        let reference = PortReference::new("Mask", PortDataType::Image)
            .show_as_drawer()
            .vertical()
            .accept_multiple_edges();
        let descriptor = reference.to_descriptor(PortDirection::Input);

        assert_eq!(descriptor.identifier, "Mask");
        assert!(descriptor.inline_editable);
        assert!(descriptor.is_vertical());
        assert!(descriptor.accepts_multiple());
        assert!(reference.matches(&descriptor));
        assert!(reference == descriptor);
    }

    #[test]
    fn test_every_field_participates() {
        let reference = PortReference::new("Value", PortDataType::Number);
        let base = reference.to_descriptor(PortDirection::Output);

        let mut renamed = base.clone();
        renamed.display_name = "Other".to_string();
        assert!(!reference.matches(&renamed));

        let mut drawer = base.clone();
        drawer.inline_editable = true;
        assert!(!reference.matches(&drawer));

        let mut retyped = base.clone();
        retyped.data_type = PortDataType::String;
        assert!(!reference.matches(&retyped));

        assert!(!reference.matches(&base.clone().vertical()));
        assert!(!reference.matches(&base.clone().multiple()));
    }

    #[test]
    fn test_identifier_is_not_compared() {
        let reference = PortReference::new("Value", PortDataType::Number);
        let descriptor = reference
            .to_descriptor(PortDirection::Input)
            .with_identifier("custom-id");
        assert!(reference.matches(&descriptor));
    }

    #[test]
    fn test_match_in_returns_first_equal_candidate() {
        let reference = PortReference::new("B", PortDataType::Any);
        let candidates = vec![
            PortReference::new("A", PortDataType::Any).to_descriptor(PortDirection::Input),
            reference.to_descriptor(PortDirection::Input).with_identifier("first"),
            reference.to_descriptor(PortDirection::Input).with_identifier("second"),
        ];

        let found = reference.match_in(&candidates).unwrap();
        assert_eq!(found.identifier, "first");

        let empty: Vec<PortDescriptor> = Vec::new();
        assert!(reference.match_in(&empty).is_none());
    }

    #[test]
    fn test_resolve_reference() {
        let references = vec![
            PortReference::new("A", PortDataType::Any),
            PortReference::new("B", PortDataType::Number),
        ];
        let descriptor = references[1].to_descriptor(PortDirection::Input);

        let found = resolve_reference(&references, Some(&descriptor), PortDirection::Input).unwrap();
        assert_eq!(found, Some(&references[1]));

        let unknown = PortReference::new("C", PortDataType::Any).to_descriptor(PortDirection::Input);
        let found = resolve_reference(&references, Some(&unknown), PortDirection::Input).unwrap();
        assert!(found.is_none());

        let found = resolve_reference(&[], Some(&descriptor), PortDirection::Input).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_resolve_reference_rejects_missing_or_wrong_direction() {
        let references = vec![PortReference::new("A", PortDataType::Any)];

        let err = resolve_reference(&references, None, PortDirection::Input).unwrap_err();
        assert!(matches!(err, SubgraphError::InvalidArgument(_)));

        let output = references[0].to_descriptor(PortDirection::Output);
        let err = resolve_reference(&references, Some(&output), PortDirection::Input).unwrap_err();
        assert!(matches!(err, SubgraphError::InvalidArgument(_)));
    }

    #[test]
    fn test_reference_serialization() {
        let reference = PortReference::new("Gain", PortDataType::Number).vertical();
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["label"], "Gain");
        assert_eq!(json["displayType"], "number");
        assert_eq!(json["vertical"], true);
        assert_eq!(json["acceptMultipleEdges"], false);

        // Missing fields take the editor defaults
        let parsed: PortReference = serde_json::from_str(r#"{"displayType":"string"}"#).unwrap();
        assert_eq!(parsed.label(), DEFAULT_LABEL);
        assert_eq!(parsed.display_type(), PortDataType::String);
    }
}
