//! Configuration for graph evaluation

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the runtime does with an edge whose handle names no current port
///
/// Handles go stale when a subgraph's schema is edited after edges were
/// drawn against the old ports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedEdgePolicy {
    /// Leave the edge out of the pass and log a warning
    #[default]
    Skip,
    /// Fail the pass with `UnresolvedPort`
    Error,
}

/// Evaluation settings carried by `EvaluationContext`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationConfig {
    /// Handling of edges with stale handles
    pub unresolved_edges: UnresolvedEdgePolicy,
    /// Whether progress is reported to the event sink
    pub emit_events: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            unresolved_edges: UnresolvedEdgePolicy::Skip,
            emit_events: true,
        }
    }
}

impl EvaluationConfig {
    /// Configuration that rejects stale edges
    pub fn strict() -> Self {
        Self {
            unresolved_edges: UnresolvedEdgePolicy::Error,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
