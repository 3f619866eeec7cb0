//! Definition library with file persistence.
//!
//! Definitions are shared assets: every proxy embedding one holds a weak
//! reference to the same `SharedDefinition` owned here. Re-inserting an
//! existing ID replaces the schema in place so live proxies stay attached
//! and are notified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::definition::{SharedDefinition, SubgraphDefinition};
use crate::error::{Result, SubgraphError};

/// Metadata for a definition (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    pub id: String,
    pub name: String,
    pub input_count: usize,
    pub output_count: usize,
    pub node_count: usize,
}

/// In-memory definition table with optional JSON persistence.
///
/// # Example
///
/// ```ignore
/// use subgraph_engine::DefinitionLibrary;
///
/// let library = DefinitionLibrary::with_persistence(".subgraphs");
/// let count = library.load_from_disk()?;
/// library.insert(my_definition)?;
/// ```
#[derive(Debug, Default)]
pub struct DefinitionLibrary {
    definitions: RwLock<HashMap<String, SharedDefinition>>,
    /// Optional path for file persistence.
    persist_path: Option<PathBuf>,
}

impl DefinitionLibrary {
    /// Create a new in-memory library without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library that persists to the given directory.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load all definitions from the persistence directory.
    ///
    /// Returns the number of definitions loaded. Files that fail to parse
    /// are logged and skipped.
    pub fn load_from_disk(&self) -> Result<usize> {
        let Some(ref path) = self.persist_path else {
            return Ok(0);
        };

        if !path.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if file_path.extension().map_or(false, |e| e == "json") {
                let content = std::fs::read_to_string(&file_path)?;
                match SubgraphDefinition::from_json(&content) {
                    Ok(definition) => {
                        log::info!("Loaded subgraph '{}' from {:?}", definition.id, file_path);
                        self.store(definition);
                        count += 1;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse subgraph from {:?}: {}", file_path, e);
                    }
                }
            }
        }
        Ok(count)
    }

    fn save_to_disk(&self, definition: &SubgraphDefinition) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let file_path = definition_file(path, &definition.id)?;
        std::fs::create_dir_all(path)?;
        std::fs::write(&file_path, definition.to_json()?)?;
        log::debug!("Saved subgraph '{}' to {:?}", definition.id, file_path);
        Ok(())
    }

    fn delete_from_disk(&self, id: &str) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let file_path = definition_file(path, id)?;
        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
            log::debug!("Deleted subgraph '{}' from {:?}", id, file_path);
        }
        Ok(())
    }

    /// Put a definition in the table, replacing in place if the ID exists
    fn store(&self, definition: SubgraphDefinition) -> SharedDefinition {
        let existing = self.definitions.read().get(&definition.id).cloned();
        match existing {
            Some(shared) => {
                shared.write().replace_schema(definition);
                // Listeners may read the definition to regenerate ports
                shared.read_recursive().notify_ports_changed();
                shared
            }
            None => {
                let id = definition.id.clone();
                let shared = definition.into_shared();
                self.definitions.write().insert(id, shared.clone());
                shared
            }
        }
    }

    /// Insert or update a definition.
    ///
    /// Boundary nodes are brought in line with the schema first. The
    /// definition is persisted if persistence is enabled.
    pub fn insert(&self, mut definition: SubgraphDefinition) -> Result<SharedDefinition> {
        definition.initialize();
        self.save_to_disk(&definition)?;
        Ok(self.store(definition))
    }

    /// Persist the current state of a stored definition
    pub fn save(&self, id: &str) -> Result<()> {
        let shared = self
            .get(id)
            .ok_or_else(|| SubgraphError::DefinitionNotFound(id.to_string()))?;
        let definition = shared.read();
        self.save_to_disk(&definition)
    }

    /// Get a definition by ID.
    pub fn get(&self, id: &str) -> Option<SharedDefinition> {
        self.definitions.read().get(id).cloned()
    }

    /// Remove a definition by ID.
    ///
    /// Proxies holding it become unbound once the last strong reference goes.
    pub fn remove(&self, id: &str) -> Result<Option<SharedDefinition>> {
        self.delete_from_disk(id)?;
        Ok(self.definitions.write().remove(id))
    }

    /// List all definitions, sorted by ID.
    pub fn list(&self) -> Vec<DefinitionSummary> {
        let mut summaries: Vec<DefinitionSummary> = self
            .definitions
            .read()
            .values()
            .map(|shared| {
                let d = shared.read();
                DefinitionSummary {
                    id: d.id.clone(),
                    name: d.name.clone(),
                    input_count: d.input_refs().len(),
                    output_count: d.output_refs().len(),
                    node_count: d.graph().nodes.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Check if a definition exists.
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.read().contains_key(id)
    }
}

/// File a definition persists to. IDs must name a single file inside `dir`.
fn definition_file(dir: &Path, id: &str) -> Result<PathBuf> {
    let unsafe_name = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\']);
    if unsafe_name {
        return Err(SubgraphError::InvalidArgument(format!(
            "definition id '{}' cannot be used as a file name",
            id
        )));
    }
    Ok(dir.join(format!("{}.json", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::port_reference::PortReference;
    use crate::proxy::SubgraphProxyNode;
    use crate::types::PortDataType;

    fn make_definition(id: &str) -> SubgraphDefinition {
        let mut def = SubgraphDefinition::new(id, format!("Definition {}", id));
        def.add_ingress_port(PortReference::new("In", PortDataType::String));
        def
    }

    #[test]
    fn test_insert_initializes_boundaries() {
        let library = DefinitionLibrary::new();
        let shared = library.insert(make_definition("a")).unwrap();
        assert!(shared.read().ingress_node().is_some());
        assert!(library.contains("a"));
    }

    #[test]
    fn test_reinsert_replaces_in_place_and_notifies() {
        let library = DefinitionLibrary::new();
        let shared = library.insert(make_definition("a")).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        shared.read().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut updated = make_definition("a");
        updated.add_egress_port(PortReference::new("Out", PortDataType::String));
        let replaced = library.insert(updated).unwrap();

        assert!(Arc::ptr_eq(&shared, &replaced));
        assert_eq!(shared.read().output_refs().len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_sorted() {
        let library = DefinitionLibrary::new();
        library.insert(make_definition("b")).unwrap();
        library.insert(make_definition("a")).unwrap();

        let list = library.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "a");
        assert_eq!(list[0].input_count, 1);
        assert_eq!(list[0].node_count, 1);
    }

    #[test]
    fn test_remove() {
        let library = DefinitionLibrary::new();
        library.insert(make_definition("a")).unwrap();
        assert!(library.remove("a").unwrap().is_some());
        assert!(library.get("a").is_none());
        assert!(library.remove("a").unwrap().is_none());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let library = DefinitionLibrary::with_persistence(dir.path());
        library.insert(make_definition("a")).unwrap();
        assert!(dir.path().join("a.json").exists());

        let reloaded = DefinitionLibrary::with_persistence(dir.path());
        assert_eq!(reloaded.load_from_disk().unwrap(), 1);
        let shared = reloaded.get("a").unwrap();
        assert_eq!(shared.read().input_refs()[0].label(), "In");
        assert!(shared.read().ingress_node().is_some());

        library.remove("a").unwrap();
        assert!(!dir.path().join("a.json").exists());
    }

    #[test]
    fn test_load_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = DefinitionLibrary::with_persistence(dir.path());
        library.insert(make_definition("ok")).unwrap();

        let reloaded = DefinitionLibrary::with_persistence(dir.path());
        assert_eq!(reloaded.load_from_disk().unwrap(), 1);
        assert!(reloaded.contains("ok"));
    }

    #[test]
    fn test_path_like_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let library = DefinitionLibrary::with_persistence(&store_dir);

        for id in ["../escape", "nested/id", "..", ""] {
            let err = library.insert(make_definition(id)).unwrap_err();
            assert!(matches!(err, SubgraphError::InvalidArgument(_)), "{:?}", id);
            assert!(!library.contains(id));
        }
        assert!(!dir.path().join("escape.json").exists());
        assert!(library.remove("../escape").is_err());
    }

    #[test]
    fn test_reinsert_notifies_without_holding_write_lock() {
        let library = DefinitionLibrary::new();
        let shared = library.insert(make_definition("a")).unwrap();

        // The listener regenerates ports, which reads the definition
        let proxy = SubgraphProxyNode::new("p", &shared);
        let port_counts = Arc::new(Mutex::new(Vec::new()));
        let counts = port_counts.clone();
        let _guard = shared.read().subscribe_scoped(move |_| {
            counts.lock().push(proxy.generate_input_descriptors().count());
        });

        let mut updated = make_definition("a");
        updated.add_ingress_port(PortReference::new("Second", PortDataType::Number));
        library.insert(updated).unwrap();

        assert_eq!(*port_counts.lock(), vec![2]);
    }

    #[test]
    fn test_save_unknown_definition() {
        let library = DefinitionLibrary::new();
        let err = library.save("missing").unwrap_err();
        assert!(matches!(err, SubgraphError::DefinitionNotFound(_)));
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let library = DefinitionLibrary::with_persistence(dir.path().join("absent"));
        assert_eq!(library.load_from_disk().unwrap(), 0);
    }
}
