//! Pass-through buffer keyed by port reference
//!
//! Values crossing a subgraph boundary during one evaluation pass are held
//! here, keyed by the `PortReference` their port structurally matched.

use std::collections::HashMap;

use crate::port_reference::PortReference;

/// Map from matched port reference to the value crossing the boundary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassThroughBuffer {
    values: HashMap<PortReference, serde_json::Value>,
}

impl PassThroughBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the one it replaced
    pub fn insert(
        &mut self,
        key: PortReference,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.values.insert(key, value)
    }

    /// Get the value stored for a reference
    pub fn get(&self, key: &PortReference) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Check whether a reference has a value
    pub fn contains(&self, key: &PortReference) -> bool {
        self.values.contains_key(key)
    }

    /// Remove the value stored for a reference
    pub fn remove(&mut self, key: &PortReference) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl FromIterator<(PortReference, serde_json::Value)> for PassThroughBuffer {
    fn from_iter<T: IntoIterator<Item = (PortReference, serde_json::Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortDataType;

    #[test]
    fn test_insert_and_replace() {
        let key = PortReference::new("A", PortDataType::Any);
        let mut buffer = PassThroughBuffer::new();

        assert!(buffer.insert(key.clone(), serde_json::json!(1)).is_none());
        assert_eq!(buffer.insert(key.clone(), serde_json::json!(2)), Some(serde_json::json!(1)));
        assert_eq!(buffer.get(&key), Some(&serde_json::json!(2)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_keys_are_structural() {
        let mut buffer = PassThroughBuffer::new();
        buffer.insert(PortReference::new("A", PortDataType::Any), serde_json::json!("a"));

        // An equal reference built independently finds the same slot
        assert!(buffer.contains(&PortReference::new("A", PortDataType::Any)));
        assert!(!buffer.contains(&PortReference::new("A", PortDataType::String)));

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
