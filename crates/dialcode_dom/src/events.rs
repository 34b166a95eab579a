//! Event dispatch
//!
//! Listeners are registered per (node, event type). Dispatch walks from the
//! target up through its ancestors until propagation is stopped.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::NodeId;

new_key_type! {
    /// Handle returned by [`Document::add_event_listener`](crate::Document::add_event_listener)
    pub struct ListenerId;
}

/// Event type identifier
pub type EventType = u32;

/// Common event types
pub mod event_types {
    use super::EventType;

    pub const CLICK: EventType = 1;
    pub const POINTER_DOWN: EventType = 2;
    pub const POINTER_UP: EventType = 3;
    pub const FOCUS: EventType = 10;
    pub const BLUR: EventType = 11;
    pub const KEY_DOWN: EventType = 20;
    pub const INPUT: EventType = 22;
    pub const CHANGE: EventType = 23;
}

/// A dispatched event
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    /// Node the event was dispatched at
    pub target: NodeId,
    /// Node whose listener is currently running
    pub current_target: NodeId,
    pub propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            propagation_stopped: false,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Event handler function type
pub type EventHandler = Arc<dyn Fn(&mut Event) + Send + Sync>;

struct Listener {
    node: NodeId,
    event_type: EventType,
    handler: EventHandler,
}

/// Registered listeners, indexed by (node, event type) in registration order
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: SlotMap<ListenerId, Listener>,
    by_target: FxHashMap<(NodeId, EventType), SmallVec<[ListenerId; 2]>>,
}

impl ListenerRegistry {
    pub fn add(&mut self, node: NodeId, event_type: EventType, handler: EventHandler) -> ListenerId {
        let id = self.listeners.insert(Listener {
            node,
            event_type,
            handler,
        });
        self.by_target
            .entry((node, event_type))
            .or_default()
            .push(id);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let Some(listener) = self.listeners.remove(id) else {
            return false;
        };
        let key = (listener.node, listener.event_type);
        if let Some(ids) = self.by_target.get_mut(&key) {
            ids.retain(|l| *l != id);
            if ids.is_empty() {
                self.by_target.remove(&key);
            }
        }
        true
    }

    /// Drop every listener bound to one of `nodes`
    pub fn purge_nodes(&mut self, nodes: &[NodeId]) -> usize {
        let doomed: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, l)| nodes.contains(&l.node))
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Listener ids for a node, in registration order
    pub fn ids_for(&self, node: NodeId, event_type: EventType) -> SmallVec<[ListenerId; 2]> {
        self.by_target
            .get(&(node, event_type))
            .cloned()
            .unwrap_or_default()
    }

    pub fn handler(&self, id: ListenerId) -> Option<EventHandler> {
        self.listeners.get(id).map(|l| Arc::clone(&l.handler))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}
