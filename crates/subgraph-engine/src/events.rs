//! Schema change notification and evaluation events
//!
//! Two kinds of observers live here:
//!
//! - `SchemaNotifier`: the publisher side of a definition's "ports changed"
//!   notification. Proxy nodes subscribe to it to regenerate their ports.
//! - `EventSink`: a transport-agnostic consumer of evaluation progress.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::definition::SubgraphDefinition;

/// Handle returned by `SchemaNotifier::subscribe`
pub type SubscriptionId = u64;

type PortsListener = Arc<dyn Fn(&SubgraphDefinition) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, PortsListener)>,
}

/// Publisher for a definition's schema-changed notification
///
/// Listeners run synchronously, once each, in subscription order. The
/// listener list is snapshotted before dispatch, so a listener may subscribe
/// or unsubscribe without deadlocking; such changes apply to the next
/// notification.
#[derive(Default)]
pub struct SchemaNotifier {
    table: Mutex<ListenerTable>,
}

impl SchemaNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(
        &self,
        listener: impl Fn(&SubgraphDefinition) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.table.lock();
        let before = table.entries.len();
        table.entries.retain(|(entry_id, _)| *entry_id != id);
        table.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// Invoke every current listener with the changed definition
    pub fn notify(&self, definition: &SubgraphDefinition) {
        let listeners: Vec<PortsListener> = self
            .table
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(definition);
        }
    }
}

impl fmt::Debug for SchemaNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Subscription that unsubscribes when dropped
///
/// Holds the notifier weakly: dropping the guard after the definition is
/// gone is a no-op.
#[derive(Debug)]
pub struct PortsSubscription {
    notifier: Weak<SchemaNotifier>,
    id: SubscriptionId,
}

impl PortsSubscription {
    pub(crate) fn new(notifier: &Arc<SchemaNotifier>, id: SubscriptionId) -> Self {
        Self {
            notifier: Arc::downgrade(notifier),
            id,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for PortsSubscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}

/// Trait for receiving evaluation events
///
/// This abstracts over the transport mechanism (channel, log, test vector)
/// so the runtime can be embedded in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while evaluating graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    /// An evaluation pass over a graph started
    #[serde(rename_all = "camelCase")]
    PassStarted { graph_id: String, node_count: usize },

    /// A node finished its pull/process/push cycle
    #[serde(rename_all = "camelCase")]
    NodeProcessed {
        graph_id: String,
        node_id: String,
        node_type: String,
    },

    /// An edge was left out of the pass because a handle did not resolve
    #[serde(rename_all = "camelCase")]
    EdgeSkipped {
        graph_id: String,
        edge_id: String,
        port: String,
    },

    /// A subgraph definition ran to completion
    #[serde(rename_all = "camelCase")]
    SubgraphInvoked {
        definition_id: String,
        inputs: usize,
        outputs: usize,
    },

    /// An evaluation pass over a graph completed
    #[serde(rename_all = "camelCase")]
    PassCompleted { graph_id: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: GraphEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_in_subscription_order() {
        let notifier = SchemaNotifier::new();
        let definition = SubgraphDefinition::new("def", "Def");
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = calls.clone();
        notifier.subscribe(move |_| first.lock().push("first"));
        let second = calls.clone();
        notifier.subscribe(move |_| second.lock().push("second"));

        notifier.notify(&definition);
        assert_eq!(*calls.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = SchemaNotifier::new();
        let definition = SubgraphDefinition::new("def", "Def");
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let id = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&definition);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_guard_unsubscribes_on_drop() {
        let notifier = Arc::new(SchemaNotifier::new());
        let id = notifier.subscribe(|_| {});
        let guard = PortsSubscription::new(&notifier, id);
        assert_eq!(notifier.listener_count(), 1);

        drop(guard);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_guard_outliving_notifier() {
        let notifier = Arc::new(SchemaNotifier::new());
        let id = notifier.subscribe(|_| {});
        let guard = PortsSubscription::new(&notifier, id);

        drop(notifier);
        // Should not panic
        drop(guard);
    }

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(GraphEvent::PassCompleted {
            graph_id: "g".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            GraphEvent::PassCompleted { graph_id } => assert_eq!(graph_id, "g"),
            _ => panic!("Expected PassCompleted event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = GraphEvent::SubgraphInvoked {
            definition_id: "blur".to_string(),
            inputs: 1,
            outputs: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "subgraphInvoked");
        assert_eq!(json["definitionId"], "blur");
    }
}
