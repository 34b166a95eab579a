//! Tree-mutation subscriptions
//!
//! Observers register interest in a target node (and optionally its whole
//! subtree). Mutations enqueue records on every interested observer; the
//! document delivers each observer's pending records as one batch once the
//! outermost mutation has finished and no internal lock is held.

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::NodeId;

new_key_type! {
    /// Handle returned by [`Document::observe`](crate::Document::observe)
    pub struct ObserverId;
}

/// What kind of change a record describes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were inserted into or removed from `target`
    ChildList,
    /// An attribute of `target` changed
    Attributes { name: String },
    /// The own text of `target` changed
    CharacterData,
    /// The observed node itself left the document. Always delivered, as the
    /// last record the observer ever receives.
    TargetRemoved,
}

/// One observed change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn target_removed(target: NodeId) -> Self {
        Self {
            kind: MutationKind::TargetRemoved,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn character_data(target: NodeId) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }
}

/// Which mutations an observer wants to hear about
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// Also report mutations of any descendant of the target
    pub subtree: bool,
}

impl ObserveOptions {
    /// Insertions and removals anywhere under the target
    pub fn structural() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Default::default()
        }
    }

    fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::CharacterData => self.character_data,
            MutationKind::TargetRemoved => true,
        }
    }
}

/// Observer callback; receives one batch of records per delivery
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

struct Observer {
    target: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
}

/// Observer table plus delivery bookkeeping
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: SlotMap<ObserverId, Observer>,
    /// Nesting depth of `Document::batch` scopes
    pub hold: u32,
    /// A delivery loop is already running further up the stack
    pub delivering: bool,
}

impl ObserverRegistry {
    pub fn add(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> ObserverId {
        self.observers.insert(Observer {
            target,
            options,
            callback,
            pending: Vec::new(),
        })
    }

    /// Remove an observer; its queued records are discarded
    pub fn remove(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    /// Drop every observer whose target is in `removed`, returning each one's
    /// final batch: whatever was still queued plus a `TargetRemoved` record.
    pub fn purge_targets(&mut self, removed: &[NodeId]) -> Vec<(MutationCallback, Vec<MutationRecord>)> {
        let gone: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|(_, obs)| removed.contains(&obs.target))
            .map(|(id, _)| id)
            .collect();
        gone.into_iter()
            .filter_map(|id| self.observers.remove(id))
            .map(|mut obs| {
                obs.pending.push(MutationRecord::target_removed(obs.target));
                (obs.callback, obs.pending)
            })
            .collect()
    }

    /// Queue `record` on every interested observer.
    ///
    /// `path` is the target followed by its ancestors, captured while the
    /// tree lock was held.
    pub fn enqueue(&mut self, record: &MutationRecord, path: &[NodeId]) -> bool {
        let mut queued = false;
        for (_, obs) in self.observers.iter_mut() {
            if !obs.options.wants(&record.kind) {
                continue;
            }
            let interested = if obs.options.subtree {
                path.contains(&obs.target)
            } else {
                record.target == obs.target
            };
            if interested {
                obs.pending.push(record.clone());
                queued = true;
            }
        }
        queued
    }

    /// Take the next non-empty batch, if any
    pub fn take_batch(&mut self) -> Option<(MutationCallback, Vec<MutationRecord>)> {
        self.observers
            .values_mut()
            .find(|obs| !obs.pending.is_empty())
            .map(|obs| (Arc::clone(&obs.callback), std::mem::take(&mut obs.pending)))
    }

    pub fn has_pending(&self) -> bool {
        self.observers.values().any(|obs| !obs.pending.is_empty())
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}
