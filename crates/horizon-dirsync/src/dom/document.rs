//! The host document.
//!
//! A [`Document`] is an element tree with attributes, a class list per
//! element, form-control values with change events, a loading ready state,
//! and mutation observers. It is the surface the direction synchronizer
//! reads from and writes to.
//!
//! Every document is created with a root element (`html`) and a `body`
//! child. Attribute and tag names are case-insensitive and stored
//! lower-cased.
//!
//! # Mutation delivery
//!
//! Attribute writes and child-list edits queue [`MutationRecord`]s for the
//! interested observers. The first queued record posts a flush task to the
//! document's event loop; the flush hands each observer its batch. Changes
//! made by an observer callback are delivered on a later flush.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_dirsync_core::logging::targets;
use horizon_dirsync_core::{ConnectionId, EventLoop, Property, Signal};
use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use super::mutation::{
    MutationKind, MutationObserverInit, MutationRecord, ObserverId, ObserverRegistry,
};
use super::selector::SelectorList;
use crate::error::{Error, Result};

new_key_type! {
    /// Identifies an element in a [`Document`].
    pub struct NodeId;
}

/// Document loading phase. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    /// The document is still being parsed.
    #[default]
    Loading,
    /// Parsing has finished; subresources may still be loading.
    Interactive,
    /// Everything has loaded.
    Complete,
}

/// Payload of a form control's change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The control that changed.
    pub target: NodeId,
    /// Its value at dispatch time.
    pub value: String,
}

struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: String,
    change: Arc<Signal<ChangeEvent>>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
            value: String::new(),
            change: Arc::new(Signal::new()),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Write an attribute, returning its previous value.
    fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) => Some(std::mem::replace(current, value.to_string())),
            None => {
                self.attributes.push((name.to_string(), value.to_string()));
                None
            }
        }
    }

    fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

struct Tree {
    nodes: SlotMap<NodeId, Element>,
    root: NodeId,
    body: NodeId,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Element::new("html"));
        let body = nodes.insert(Element::new("body"));
        if let Some(body_element) = nodes.get_mut(body) {
            body_element.parent = Some(root);
        }
        if let Some(root_element) = nodes.get_mut(root) {
            root_element.children.push(body);
        }
        Self { nodes, root, body }
    }

    fn get(&self, node: NodeId) -> Result<&Element> {
        self.nodes.get(node).ok_or(Error::UnknownNode(node))
    }

    fn get_mut(&mut self, node: NodeId) -> Result<&mut Element> {
        self.nodes.get_mut(node).ok_or(Error::UnknownNode(node))
    }

    /// `node` followed by its ancestors, nearest first.
    fn chain(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            chain.push(id);
            current = self.nodes.get(id).and_then(|e| e.parent);
        }
        chain
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.chain(node).contains(&ancestor)
    }

    /// Connected elements in tree order.
    fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(element) = self.nodes.get(id) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        order
    }

    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(child)?.parent.take()?;
        if let Some(parent_element) = self.nodes.get_mut(parent) {
            parent_element.children.retain(|&c| c != child);
        }
        Some(parent)
    }
}

/// An element tree with observable mutations.
pub struct Document {
    tree: RwLock<Tree>,
    ready_state: Property<ReadyState>,
    ready_state_changed: Signal<ReadyState>,
    content_loaded: Signal<()>,
    observers: Mutex<ObserverRegistry>,
    flush_scheduled: AtomicBool,
    event_loop: Arc<EventLoop>,
    this: Weak<Document>,
}

impl Document {
    /// Create an empty document in the `Loading` state whose mutation
    /// deliveries run on `event_loop`.
    pub fn new(event_loop: Arc<EventLoop>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            tree: RwLock::new(Tree::new()),
            ready_state: Property::new(ReadyState::Loading),
            ready_state_changed: Signal::new(),
            content_loaded: Signal::new(),
            observers: Mutex::new(ObserverRegistry::default()),
            flush_scheduled: AtomicBool::new(false),
            event_loop,
            this: this.clone(),
        })
    }

    /// The event loop mutation deliveries are posted to.
    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.event_loop
    }

    // -------------------------------------------------------------------------
    // Tree
    // -------------------------------------------------------------------------

    /// The root (`html`) element.
    pub fn root(&self) -> NodeId {
        self.tree.read().root
    }

    /// The `body` element.
    pub fn body(&self) -> NodeId {
        self.tree.read().body
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.write().nodes.insert(Element::new(tag))
    }

    /// Append `child` as the last child of `parent`, moving it if it
    /// already has a parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut records = Vec::new();
        {
            let mut tree = self.tree.write();
            tree.get(parent)?;
            tree.get(child)?;
            if child == tree.root {
                return Err(Error::Hierarchy {
                    parent,
                    child,
                    message: "the root element cannot be moved",
                });
            }
            if tree.is_inclusive_ancestor(child, parent) {
                return Err(Error::Hierarchy {
                    parent,
                    child,
                    message: "an element cannot become its own descendant",
                });
            }

            if let Some(old_parent) = tree.detach(child) {
                records.push((
                    MutationRecord {
                        target: old_parent,
                        kind: MutationKind::ChildList {
                            added: Vec::new(),
                            removed: vec![child],
                        },
                    },
                    tree.chain(old_parent),
                ));
            }

            tree.get_mut(child)?.parent = Some(parent);
            tree.get_mut(parent)?.children.push(child);
            records.push((
                MutationRecord {
                    target: parent,
                    kind: MutationKind::ChildList {
                        added: vec![child],
                        removed: Vec::new(),
                    },
                },
                tree.chain(parent),
            ));
        }

        for (record, chain) in records {
            self.queue_record(record, &chain);
        }
        Ok(())
    }

    /// Remove `child` from `parent`. The element stays valid, detached.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let chain = {
            let mut tree = self.tree.write();
            tree.get(parent)?;
            if tree.get(child)?.parent != Some(parent) {
                return Err(Error::Hierarchy {
                    parent,
                    child,
                    message: "not a child of this parent",
                });
            }
            tree.detach(child);
            tree.chain(parent)
        };

        self.queue_record(
            MutationRecord {
                target: parent,
                kind: MutationKind::ChildList {
                    added: Vec::new(),
                    removed: vec![child],
                },
            },
            &chain,
        );
        Ok(())
    }

    /// The parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().nodes.get(node).and_then(|e| e.parent)
    }

    /// The children of `node`, in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .read()
            .nodes
            .get(node)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    /// The lower-cased tag name of `node`.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.tree.read().nodes.get(node).map(|e| e.tag.clone())
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let tree = self.tree.read();
        tree.nodes.contains_key(node) && tree.is_inclusive_ancestor(ancestor, node)
    }

    /// Whether `node` is attached to the document's root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root(), node)
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// The value of attribute `name` on `node`.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.tree
            .read()
            .nodes
            .get(node)?
            .attribute(&name)
            .map(str::to_string)
    }

    /// Set attribute `name` on `node`.
    ///
    /// A mutation record is queued even when the value does not change.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let (old_value, chain) = {
            let mut tree = self.tree.write();
            let old_value = tree.get_mut(node)?.set_attribute(&name, value);
            (old_value, tree.chain(node))
        };
        self.queue_attribute_record(node, name, old_value, &chain);
        Ok(())
    }

    /// Remove attribute `name` from `node`. Returns whether it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool> {
        let name = name.to_ascii_lowercase();
        let (old_value, chain) = {
            let mut tree = self.tree.write();
            let old_value = tree.get_mut(node)?.remove_attribute(&name);
            (old_value, tree.chain(node))
        };
        let removed = old_value.is_some();
        if removed {
            self.queue_attribute_record(node, name, old_value, &chain);
        }
        Ok(removed)
    }

    /// Whether `node`'s class list contains `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.tree
            .read()
            .nodes
            .get(node)
            .is_some_and(|e| e.has_class(class))
    }

    /// Add `class` to `node`'s class list. Returns whether the list changed.
    pub fn add_class(&self, node: NodeId, class: &str) -> Result<bool> {
        self.toggle_class(node, class, Some(true))
            .map(|(_, changed)| changed)
    }

    /// Remove `class` from `node`'s class list. Returns whether the list
    /// changed.
    pub fn remove_class(&self, node: NodeId, class: &str) -> Result<bool> {
        self.toggle_class(node, class, Some(false))
            .map(|(_, changed)| changed)
    }

    /// Toggle `class`, or force it on or off. Returns whether the class is
    /// present afterwards and whether the list changed.
    ///
    /// The `class` attribute is only written when the list changes.
    pub fn toggle_class(
        &self,
        node: NodeId,
        class: &str,
        force: Option<bool>,
    ) -> Result<(bool, bool)> {
        let written = {
            let mut tree = self.tree.write();
            let element = tree.get_mut(node)?;
            let present = element.has_class(class);
            let wanted = force.unwrap_or(!present);
            if wanted == present {
                return Ok((present, false));
            }

            let mut classes: Vec<String> = element
                .classes()
                .filter(|&c| c != class)
                .map(str::to_string)
                .collect();
            if wanted {
                classes.push(class.to_string());
            }
            let old_value = element.set_attribute("class", &classes.join(" "));
            (wanted, old_value, tree.chain(node))
        };

        let (present, old_value, chain) = written;
        self.queue_attribute_record(node, "class".to_string(), old_value, &chain);
        Ok((present, true))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The first connected element, in tree order, whose `id` is `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.tree.read();
        tree.descendants()
            .into_iter()
            .find(|&node| tree.nodes.get(node).and_then(|e| e.attribute("id")) == Some(id))
    }

    /// The first connected element, in tree order, matching `selectors`.
    pub fn query_selector(&self, selectors: &str) -> Result<Option<NodeId>> {
        let list = SelectorList::parse(selectors)?;
        Ok(self.query_selector_list(&list))
    }

    /// Like [`query_selector`](Self::query_selector) with a pre-parsed list.
    pub fn query_selector_list(&self, list: &SelectorList) -> Option<NodeId> {
        let tree = self.tree.read();
        tree.descendants().into_iter().find(|&node| {
            tree.nodes.get(node).is_some_and(|element| {
                list.matches(&element.tag, element.attribute("id"), |class| {
                    element.has_class(class)
                })
            })
        })
    }

    // -------------------------------------------------------------------------
    // Form controls
    // -------------------------------------------------------------------------

    /// The current value of a form control.
    pub fn value(&self, node: NodeId) -> Option<String> {
        self.tree.read().nodes.get(node).map(|e| e.value.clone())
    }

    /// Set a control's value without dispatching a change event.
    pub fn set_value(&self, node: NodeId, value: &str) -> Result<()> {
        self.tree.write().get_mut(node)?.value = value.to_string();
        Ok(())
    }

    /// Listen for change events on `node`.
    pub fn on_change<F>(&self, node: NodeId, listener: F) -> Result<ConnectionId>
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let signal = self.tree.read().get(node)?.change.clone();
        Ok(signal.connect(listener))
    }

    /// Remove a change listener. Returns `false` if it was already gone.
    pub fn off_change(&self, node: NodeId, id: ConnectionId) -> bool {
        let signal = match self.tree.read().nodes.get(node) {
            Some(element) => element.change.clone(),
            None => return false,
        };
        signal.disconnect(id)
    }

    /// Number of change listeners on `node`.
    pub fn change_listener_count(&self, node: NodeId) -> usize {
        self.tree
            .read()
            .nodes
            .get(node)
            .map_or(0, |e| e.change.connection_count())
    }

    /// Fire a change event on `node` with its current value.
    pub fn dispatch_change(&self, node: NodeId) -> Result<()> {
        let (signal, value) = {
            let tree = self.tree.read();
            let element = tree.get(node)?;
            (element.change.clone(), element.value.clone())
        };
        signal.emit(ChangeEvent {
            target: node,
            value,
        });
        Ok(())
    }

    /// Simulate a user picking `value`: set it, then fire a change event.
    pub fn select_value(&self, node: NodeId, value: &str) -> Result<()> {
        self.set_value(node, value)?;
        self.dispatch_change(node)
    }

    // -------------------------------------------------------------------------
    // Ready state
    // -------------------------------------------------------------------------

    /// The current loading phase.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    /// Advance the loading phase. Moving backwards or staying put is
    /// ignored and returns `false`.
    ///
    /// Leaving `Loading` emits [`content_loaded`](Self::content_loaded)
    /// after [`ready_state_changed`](Self::ready_state_changed).
    pub fn set_ready_state(&self, state: ReadyState) -> bool {
        let previous = self.ready_state.get();
        if state <= previous {
            return false;
        }
        self.ready_state.set(state);
        tracing::debug!(
            target: targets::DOCUMENT,
            ?previous,
            ?state,
            "ready state changed"
        );
        self.ready_state_changed.emit(state);
        if previous == ReadyState::Loading {
            self.content_loaded.emit(());
        }
        true
    }

    /// Emitted with the new state whenever the ready state advances.
    pub fn ready_state_changed(&self) -> &Signal<ReadyState> {
        &self.ready_state_changed
    }

    /// Emitted once, when the document leaves `Loading`.
    pub fn content_loaded(&self) -> &Signal<()> {
        &self.content_loaded
    }

    // -------------------------------------------------------------------------
    // Mutation observers
    // -------------------------------------------------------------------------

    /// Observe changes on `target` as selected by `init`.
    pub fn observe<F>(
        &self,
        target: NodeId,
        init: MutationObserverInit,
        callback: F,
    ) -> Result<ObserverId>
    where
        F: Fn(&[MutationRecord]) + Send + Sync + 'static,
    {
        init.validate()?;
        self.tree.read().get(target)?;
        Ok(self.observers.lock().register(target, init, Arc::new(callback)))
    }

    /// Stop an observer. Undelivered records are dropped.
    pub fn disconnect_observer(&self, id: ObserverId) -> bool {
        self.observers.lock().remove(id)
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Take an observer's undelivered records.
    pub fn take_records(&self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers.lock().take_records(id)
    }

    /// Deliver every queued record now. Returns the number of records
    /// delivered.
    pub fn flush_mutations(&self) -> usize {
        self.flush_scheduled.store(false, Ordering::SeqCst);
        let batches = self.observers.lock().take_all_pending();
        let mut delivered = 0;
        for (callback, records) in batches {
            delivered += records.len();
            callback(&records);
        }
        delivered
    }

    fn queue_attribute_record(
        &self,
        node: NodeId,
        name: String,
        old_value: Option<String>,
        chain: &[NodeId],
    ) {
        self.queue_record(
            MutationRecord {
                target: node,
                kind: MutationKind::Attributes { name, old_value },
            },
            chain,
        );
    }

    fn queue_record(&self, record: MutationRecord, chain: &[NodeId]) {
        let queued = self.observers.lock().enqueue(&record, chain);
        if queued && !self.flush_scheduled.swap(true, Ordering::SeqCst) {
            let document = self.this.clone();
            self.event_loop.post_task(move || {
                if let Some(document) = document.upgrade() {
                    document.flush_mutations();
                }
            });
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.read().nodes.len())
            .field("ready_state", &self.ready_state())
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Document: Send, Sync);
