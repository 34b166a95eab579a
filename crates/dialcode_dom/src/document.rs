//! Shared element tree
//!
//! `Document` is a cheap-to-clone handle. The tree, the observer table and
//! the listener table each sit behind their own lock, and no lock is ever
//! held while user callbacks run, so observers and listeners are free to
//! read or mutate the document they were registered on.

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::SlotMap;
use tracing::trace;

use crate::error::{DomError, Result};
use crate::events::{event_types, Event, EventType, ListenerId, ListenerRegistry};
use crate::mutation::{MutationRecord, ObserveOptions, ObserverId, ObserverRegistry};
use crate::node::{Element, ElementSpec, NodeId};
use crate::selector::Selector;

struct Tree {
    nodes: SlotMap<NodeId, Element>,
}

impl Tree {
    fn get(&self, id: NodeId) -> Result<&Element> {
        self.nodes.get(id).ok_or(DomError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        self.nodes.get_mut(id).ok_or(DomError::NodeNotFound(id))
    }

    /// `id` followed by its ancestors, nearest first
    fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cur = Some(id);
        while let Some(node) = cur {
            path.push(node);
            cur = self.nodes.get(node).and_then(|el| el.parent);
        }
        path
    }

    fn detach_from_parent(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(id)?.parent.take()?;
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        Some(parent)
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(el) = self.nodes.get(id) {
            for child in &el.children {
                self.collect_subtree(*child, out);
            }
        }
    }

    fn collect_matches(&self, id: NodeId, selector: &Selector, first_only: bool, out: &mut Vec<NodeId>) {
        let Some(el) = self.nodes.get(id) else {
            return;
        };
        for child in &el.children {
            if first_only && !out.is_empty() {
                return;
            }
            if let Some(child_el) = self.nodes.get(*child) {
                if selector.matches(child_el) {
                    out.push(*child);
                }
            }
            self.collect_matches(*child, selector, first_only, out);
        }
    }

    fn build(&mut self, spec: &ElementSpec, parent: Option<NodeId>) -> NodeId {
        let mut el = Element::new(&spec.tag);
        el.classes = spec.classes.iter().cloned().collect();
        el.attributes = spec.attributes.iter().cloned().collect();
        el.text = spec.text.clone();
        el.parent = parent;
        let id = self.nodes.insert(el);
        for child_spec in &spec.children {
            let child = self.build(child_spec, Some(id));
            if let Some(el) = self.nodes.get_mut(id) {
                el.children.push(child);
            }
        }
        id
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(el) = self.nodes.get(id) else {
            return;
        };
        out.push('<');
        out.push_str(&el.tag);
        if !el.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(
                &el.classes.join(" "),
            ));
            out.push('"');
        }
        for (name, value) in &el.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
        out.push('>');
        out.push_str(&html_escape::encode_text(&el.text));
        for child in &el.children {
            self.write_html(*child, out);
        }
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
    }
}

struct Inner {
    tree: Mutex<Tree>,
    observers: Mutex<ObserverRegistry>,
    listeners: Mutex<ListenerRegistry>,
    root: NodeId,
}

/// Handle to a shared element tree
#[derive(Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

/// Holds record delivery back until dropped
struct DeliveryHold<'a>(&'a Document);

impl Drop for DeliveryHold<'_> {
    fn drop(&mut self) {
        let mut obs = self.0.inner.observers.lock();
        obs.hold = obs.hold.saturating_sub(1);
    }
}

/// Clears the `delivering` flag even if a callback panics
struct DeliveryLoop<'a>(&'a Document);

impl Drop for DeliveryLoop<'_> {
    fn drop(&mut self) {
        self.0.inner.observers.lock().delivering = false;
    }
}

impl Document {
    /// Create an empty document with a `body` root element
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Element::new("body"));
        Self {
            inner: Arc::new(Inner {
                tree: Mutex::new(Tree { nodes }),
                observers: Mutex::new(ObserverRegistry::default()),
                listeners: Mutex::new(ListenerRegistry::default()),
                root,
            }),
        }
    }

    /// The document root
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    // =====================================================================
    // Construction
    // =====================================================================

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.tree.lock().nodes.insert(Element::new(tag))
    }

    /// Create a detached subtree from an [`ElementSpec`] and return its root
    pub fn create_tree(&self, spec: &ElementSpec) -> NodeId {
        self.inner.tree.lock().build(spec, None)
    }

    // =====================================================================
    // Structure
    // =====================================================================

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let records = {
            let mut tree = self.inner.tree.lock();
            tree.get(child)?;
            tree.get(parent)?;
            let parent_path = tree.path(parent);
            if parent_path.contains(&child) {
                return Err(DomError::HierarchyRequest { parent, child });
            }

            let mut records = Vec::with_capacity(2);
            if let Some(old_parent) = tree.detach_from_parent(child) {
                records.push((
                    MutationRecord::child_list(old_parent, Vec::new(), vec![child]),
                    tree.path(old_parent),
                ));
            }
            tree.get_mut(parent)?.children.push(child);
            tree.get_mut(child)?.parent = Some(parent);
            records.push((
                MutationRecord::child_list(parent, vec![child], Vec::new()),
                parent_path,
            ));
            records
        };
        self.notify(records);
        Ok(())
    }

    /// Remove `node` and its whole subtree from the document.
    ///
    /// Listeners bound to removed nodes are dropped with them. Observers whose
    /// target was removed receive a final `TargetRemoved` record and are
    /// disconnected.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        if node == self.inner.root {
            return Err(DomError::HierarchyRequest {
                parent: node,
                child: node,
            });
        }
        let (records, removed) = {
            let mut tree = self.inner.tree.lock();
            tree.get(node)?;
            let mut records = Vec::with_capacity(1);
            if let Some(parent) = tree.detach_from_parent(node) {
                records.push((
                    MutationRecord::child_list(parent, Vec::new(), vec![node]),
                    tree.path(parent),
                ));
            }
            let mut removed = Vec::new();
            tree.collect_subtree(node, &mut removed);
            for id in &removed {
                tree.nodes.remove(*id);
            }
            (records, removed)
        };
        let purged = self.inner.listeners.lock().purge_nodes(&removed);
        let orphaned = self.inner.observers.lock().purge_targets(&removed);
        trace!(
            nodes = removed.len(),
            listeners = purged,
            observers = orphaned.len(),
            "removed subtree"
        );
        self.notify(records);
        for (callback, records) in orphaned {
            callback(&records);
        }
        Ok(())
    }

    /// Whether `node` still exists (attached or detached)
    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.tree.lock().nodes.contains_key(node)
    }

    /// Whether `node` is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.inner.tree.lock();
        tree.nodes.contains_key(node) && tree.path(node).last() == Some(&self.inner.root)
    }

    /// Whether `node` is a strict descendant of `ancestor`
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let tree = self.inner.tree.lock();
        tree.path(node).iter().skip(1).any(|n| *n == ancestor)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.lock().nodes.get(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .lock()
            .nodes
            .get(node)
            .map(|el| el.children.clone())
            .unwrap_or_default()
    }

    // =====================================================================
    // Content
    // =====================================================================

    pub fn tag(&self, node: NodeId) -> Option<String> {
        Some(self.inner.tree.lock().nodes.get(node)?.tag.clone())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.inner
            .tree
            .lock()
            .nodes
            .get(node)
            .is_some_and(|el| el.has_class(class))
    }

    /// Add a class (no record is produced if it was already present)
    pub fn add_class(&self, node: NodeId, class: &str) -> Result<()> {
        let record = {
            let mut tree = self.inner.tree.lock();
            let el = tree.get_mut(node)?;
            if el.has_class(class) {
                None
            } else {
                el.classes.push(class.to_string());
                Some((MutationRecord::attribute(node, "class"), tree.path(node)))
            }
        };
        self.notify(record);
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .tree
            .lock()
            .nodes
            .get(node)?
            .attributes
            .get(name)
            .cloned()
    }

    /// Set an attribute. Always produces a record, even when the value is unchanged.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let record = {
            let mut tree = self.inner.tree.lock();
            tree.get_mut(node)?
                .attributes
                .insert(name.to_string(), value.to_string());
            (MutationRecord::attribute(node, name), tree.path(node))
        };
        self.notify(Some(record));
        Ok(())
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool> {
        let record = {
            let mut tree = self.inner.tree.lock();
            let existed = tree.get_mut(node)?.attributes.shift_remove(name).is_some();
            existed.then(|| (MutationRecord::attribute(node, name), tree.path(node)))
        };
        let existed = record.is_some();
        self.notify(record);
        Ok(existed)
    }

    /// The element's own text (children excluded)
    pub fn text(&self, node: NodeId) -> Option<String> {
        Some(self.inner.tree.lock().nodes.get(node)?.text.clone())
    }

    /// Replace the element's own text. Always produces a record.
    pub fn set_text(&self, node: NodeId, text: &str) -> Result<()> {
        let record = {
            let mut tree = self.inner.tree.lock();
            tree.get_mut(node)?.text = text.to_string();
            (MutationRecord::character_data(node), tree.path(node))
        };
        self.notify(Some(record));
        Ok(())
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// First descendant of `root` (in document order) matching `selector`
    pub fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut out = Vec::with_capacity(1);
        self.inner
            .tree
            .lock()
            .collect_matches(root, selector, true, &mut out);
        out.first().copied()
    }

    /// Every descendant of `root` matching `selector`, in document order
    pub fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.inner
            .tree
            .lock()
            .collect_matches(root, selector, false, &mut out);
        out
    }

    /// Serialize `node` and its subtree
    pub fn outer_html(&self, node: NodeId) -> Option<String> {
        let tree = self.inner.tree.lock();
        tree.nodes.get(node)?;
        let mut out = String::new();
        tree.write_html(node, &mut out);
        Some(out)
    }

    // =====================================================================
    // Mutation observers
    // =====================================================================

    /// Subscribe to mutations of `target` (and its subtree if requested)
    pub fn observe<F>(&self, target: NodeId, options: ObserveOptions, callback: F) -> Result<ObserverId>
    where
        F: Fn(&[MutationRecord]) + Send + Sync + 'static,
    {
        if !self.contains(target) {
            return Err(DomError::NodeNotFound(target));
        }
        Ok(self
            .inner
            .observers
            .lock()
            .add(target, options, Arc::new(callback)))
    }

    /// Stop an observer. Records already queued for it are discarded.
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        self.inner.observers.lock().remove(observer)
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Run `f` with record delivery deferred until it returns, so that every
    /// mutation made inside reaches each observer as a single batch.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.observers.lock().hold += 1;
        let hold = DeliveryHold(self);
        let result = f();
        drop(hold);
        self.flush();
        result
    }

    fn notify(&self, records: impl IntoIterator<Item = (MutationRecord, Vec<NodeId>)>) {
        let queued = {
            let mut obs = self.inner.observers.lock();
            let mut queued = false;
            for (record, path) in records {
                queued |= obs.enqueue(&record, &path);
            }
            queued
        };
        if queued {
            self.flush();
        }
    }

    /// Deliver queued records unless delivery is held or already running
    fn flush(&self) {
        {
            let mut obs = self.inner.observers.lock();
            if obs.hold > 0 || obs.delivering || !obs.has_pending() {
                return;
            }
            obs.delivering = true;
        }
        let _running = DeliveryLoop(self);
        loop {
            let batch = self.inner.observers.lock().take_batch();
            let Some((callback, records)) = batch else {
                break;
            };
            callback(&records);
        }
    }

    // =====================================================================
    // Events
    // =====================================================================

    /// Register a listener for `event_type` on `node`
    pub fn add_event_listener<F>(&self, node: NodeId, event_type: EventType, handler: F) -> Result<ListenerId>
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        if !self.contains(node) {
            return Err(DomError::NodeNotFound(node));
        }
        Ok(self
            .inner
            .listeners
            .lock()
            .add(node, event_type, Arc::new(handler)))
    }

    pub fn remove_event_listener(&self, listener: ListenerId) -> bool {
        self.inner.listeners.lock().remove(listener)
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Dispatch an event at `target`, bubbling through its ancestors.
    ///
    /// A listener removed while the event is in flight does not run.
    pub fn dispatch(&self, target: NodeId, event_type: EventType) -> Result<Event> {
        let path = {
            let tree = self.inner.tree.lock();
            tree.get(target)?;
            tree.path(target)
        };
        let mut event = Event::new(event_type, target);
        for node in path {
            event.current_target = node;
            let ids = self.inner.listeners.lock().ids_for(node, event_type);
            for id in ids {
                let handler = self.inner.listeners.lock().handler(id);
                if let Some(handler) = handler {
                    handler(&mut event);
                }
                if event.propagation_stopped {
                    return Ok(event);
                }
            }
        }
        Ok(event)
    }

    /// Dispatch a click at `target`
    pub fn click(&self, target: NodeId) -> Result<()> {
        self.dispatch(target, event_types::CLICK).map(|_| ())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.inner.root)
            .field("nodes", &self.inner.tree.lock().nodes.len())
            .finish()
    }
}
