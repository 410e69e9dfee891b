//! The shared document tree

use crate::observer::{
    MutationObserver, MutationRecord, ObserveOptions, ObserverHandle, ObserverId,
};
use crate::{DomError, ElementData, Node, NodeData, NodeId, Result};
use glossa_log::trace;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event callback registered on a node.
pub type Listener = Arc<dyn Fn(&Document, NodeId) + Send + Sync>;

struct Registration {
    id: ObserverId,
    target: NodeId,
    options: ObserveOptions,
    observer: Arc<dyn MutationObserver>,
}

#[derive(Default)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::NodeNotFound(id))
    }

    fn element(&self, id: NodeId) -> Result<&ElementData> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.index()).and_then(|n| n.parent);
        }
        false
    }

    /// Unlinks `child` from its parent, returning the former parent.
    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(child.index())?.parent.take()?;
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.retain(|c| *c != child);
        }
        Some(parent)
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node(parent)?;
        self.node(child)?;
        let accepts_children = matches!(parent_node.data, NodeData::Document | NodeData::Element(_));
        if !accepts_children || child == NodeId::DOCUMENT || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn append(&mut self, parent: NodeId, child: NodeId, records: &mut Vec<MutationRecord>) {
        if let Some(old_parent) = self.detach(child) {
            records.push(MutationRecord::child_list(old_parent, Vec::new(), vec![child]));
        }
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Removes every child of `id` and optionally inserts one replacement.
    fn replace_children(
        &mut self,
        id: NodeId,
        replacement: Option<NodeData>,
        records: &mut Vec<MutationRecord>,
    ) -> Result<()> {
        let removed = std::mem::take(&mut self.node_mut(id)?.children);
        for child in &removed {
            self.nodes[child.index()].parent = None;
        }
        let added: Vec<NodeId> = replacement
            .map(|data| {
                let new_id = self.alloc(data);
                self.nodes[new_id.index()].parent = Some(id);
                self.nodes[id.index()].children.push(new_id);
                new_id
            })
            .into_iter()
            .collect();
        if !added.is_empty() || !removed.is_empty() {
            records.push(MutationRecord::child_list(id, added, removed));
        }
        Ok(())
    }

    fn set_only_child(
        &mut self,
        id: NodeId,
        replacement: Option<NodeData>,
        records: &mut Vec<MutationRecord>,
    ) -> Result<()> {
        if let Some(data) = &replacement {
            if self.rewrite_only_child(id, data)? {
                return Ok(());
            }
        }
        self.replace_children(id, replacement, records)
    }

    /// Rewrites the data of a lone text or markup child of the same kind.
    fn rewrite_only_child(&mut self, id: NodeId, data: &NodeData) -> Result<bool> {
        let &[child] = self.node(id)?.children.as_slice() else {
            return Ok(false);
        };
        match (&mut self.nodes[child.index()].data, data) {
            (NodeData::Text(old), NodeData::Text(new)) | (NodeData::Markup(old), NodeData::Markup(new)) => {
                old.clone_from(new);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.index()) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) | NodeData::Markup(text) => out.push_str(text),
            NodeData::Document | NodeData::Element(_) => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.index()) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => escape_text(text, out),
            NodeData::Markup(markup) => out.push_str(markup),
            NodeData::Document => {
                for child in &node.children {
                    self.serialize(*child, out);
                }
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                for child in &node.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

struct DocumentInner {
    tree: RwLock<Tree>,
    observers: RwLock<Vec<Registration>>,
    listeners: RwLock<HashMap<(NodeId, String), Vec<Listener>>>,
    next_observer: AtomicU64,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

/// A live document tree shared between the host page and the engine.
///
/// Cloning is cheap and yields another handle to the same tree.
///
/// ```
/// use glossa_dom::Document;
///
/// let doc = Document::new();
/// let title = doc.create_element("h1");
/// doc.set_attribute(title, "data-i18n", "home.title").unwrap();
/// doc.append_child(doc.body(), title).unwrap();
/// assert_eq!(doc.get_attribute(title, "data-i18n").as_deref(), Some("home.title"));
/// ```
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.tree.read().nodes.len())
            .field("observers", &self.inner.observers.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut tree = Tree::default();
        let mut records = Vec::new();
        let document = tree.alloc(NodeData::Document);
        let html = tree.alloc(NodeData::Element(ElementData::new("html")));
        let head = tree.alloc(NodeData::Element(ElementData::new("head")));
        let body = tree.alloc(NodeData::Element(ElementData::new("body")));
        tree.append(document, html, &mut records);
        tree.append(html, head, &mut records);
        tree.append(html, body, &mut records);

        Self {
            inner: Arc::new(DocumentInner {
                tree: RwLock::new(tree),
                observers: RwLock::new(Vec::new()),
                listeners: RwLock::new(HashMap::new()),
                next_observer: AtomicU64::new(1),
                html,
                head,
                body,
            }),
        }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> NodeId {
        self.inner.html
    }

    pub fn head(&self) -> NodeId {
        self.inner.head
    }

    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    /// Whether two handles refer to the same tree.
    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Nodes allocated in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.inner.tree.read().nodes.len()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner
            .tree
            .write()
            .alloc(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner.tree.write().alloc(NodeData::Text(text.to_string()))
    }

    // ------------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------------

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Tree, &mut Vec<MutationRecord>) -> Result<R>,
    ) -> Result<R> {
        let mut records = Vec::new();
        let result = {
            let mut tree = self.inner.tree.write();
            f(&mut tree, &mut records)
        };
        self.notify(records);
        result
    }

    /// Append `child` to `parent`, moving it if it is already attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.append_children(parent, &[child])
    }

    /// Append several nodes as one insertion, reported in a single record.
    pub fn append_children(&self, parent: NodeId, children: &[NodeId]) -> Result<()> {
        self.mutate(|tree, records| {
            for child in children {
                tree.check_insert(parent, *child)?;
            }
            for child in children {
                tree.append(parent, *child, records);
            }
            if !children.is_empty() {
                records.push(MutationRecord::child_list(parent, children.to_vec(), Vec::new()));
            }
            Ok(())
        })
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.mutate(|tree, records| {
            if tree.node(child)?.parent != Some(parent) {
                return Err(DomError::NotAChild { parent, child });
            }
            tree.detach(child);
            records.push(MutationRecord::child_list(parent, Vec::new(), vec![child]));
            Ok(())
        })
    }

    /// Replace all children of `node` with a single text node.
    ///
    /// On a text node, or an element whose only child is a text node, the
    /// data is replaced in place without a record.
    pub fn set_text_content(&self, node: NodeId, text: &str) -> Result<()> {
        self.mutate(|tree, records| {
            if let NodeData::Text(data) = &mut tree.node_mut(node)?.data {
                *data = text.to_string();
                return Ok(());
            }
            let replacement = (!text.is_empty()).then(|| NodeData::Text(text.to_string()));
            tree.set_only_child(node, replacement, records)
        })
    }

    /// Replace all children of an element with verbatim markup.
    ///
    /// The markup is trusted: it is neither parsed nor sanitized. A lone
    /// markup child is rewritten in place without a record.
    pub fn set_inner_html(&self, node: NodeId, markup: &str) -> Result<()> {
        self.mutate(|tree, records| {
            tree.element(node)?;
            let replacement = (!markup.is_empty()).then(|| NodeData::Markup(markup.to_string()));
            tree.set_only_child(node, replacement, records)
        })
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.mutate(|tree, records| {
            let old = tree.element_mut(node)?.set_attribute(name, value);
            records.push(MutationRecord::attribute(node, name, old));
            Ok(())
        })
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        self.mutate(|tree, records| {
            let old = tree.element_mut(node)?.remove_attribute(name);
            if old.is_some() {
                records.push(MutationRecord::attribute(node, name, old.clone()));
            }
            Ok(old)
        })
    }

    /// Add (`force = true`) or remove a class token. No-op when already in that state.
    pub fn toggle_class(&self, node: NodeId, class: &str, force: bool) -> Result<()> {
        let current = {
            let tree = self.inner.tree.read();
            let element = tree.element(node)?;
            let has = element.classes().any(|c| c == class);
            if has == force {
                return Ok(());
            }
            element.classes().map(str::to_string).collect::<Vec<_>>()
        };
        let updated: Vec<String> = if force {
            current.into_iter().chain(std::iter::once(class.to_string())).collect()
        } else {
            current.into_iter().filter(|c| c != class).collect()
        };
        self.set_attribute(node, "class", &updated.join(" "))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.inner.tree.read();
        tree.element(node).ok()?.attribute(name).map(str::to_string)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        let tree = self.inner.tree.read();
        tree.element(node)
            .map(|el| el.attribute(name).is_some())
            .unwrap_or(false)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        let tree = self.inner.tree.read();
        tree.element(node)
            .map(|el| el.classes().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Lowercased tag name of an element.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        let tree = self.inner.tree.read();
        tree.element(node).ok().map(|el| el.tag.clone())
    }

    /// A snapshot of the node.
    pub fn node(&self, node: NodeId) -> Option<Node> {
        self.inner.tree.read().node(node).ok().cloned()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.read().node(node).ok()?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .read()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.tree.read().is_inclusive_ancestor(ancestor, node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(NodeId::DOCUMENT, node)
    }

    /// Concatenated text and markup beneath `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.tree.read().text_content(node, &mut out);
        out
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let tree = self.inner.tree.read();
        let mut out = String::new();
        if let Ok(n) = tree.node(node) {
            for child in &n.children {
                tree.serialize(*child, &mut out);
            }
        }
        out
    }

    /// Serialized node, including its own tag.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.tree.read().serialize(node, &mut out);
        out
    }

    /// `root` and every node beneath it, in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.inner.tree.read().preorder(root)
    }

    /// Elements at or beneath `root` carrying at least one of `names`, in document order.
    pub fn elements_with_any_attribute(&self, root: NodeId, names: &[&str]) -> Vec<NodeId> {
        let tree = self.inner.tree.read();
        tree.preorder(root)
            .into_iter()
            .filter(|id| {
                tree.element(*id)
                    .map(|el| names.iter().any(|name| el.attribute(name).is_some()))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Elements at or beneath `root` with the given class, in document order.
    pub fn elements_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let tree = self.inner.tree.read();
        tree.preorder(root)
            .into_iter()
            .filter(|id| {
                tree.element(*id)
                    .map(|el| el.classes().any(|c| c == class))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Text nodes at or beneath `root` with their data, in document order.
    pub fn text_nodes(&self, root: NodeId) -> Vec<(NodeId, String)> {
        let tree = self.inner.tree.read();
        tree.preorder(root)
            .into_iter()
            .filter_map(|id| match &tree.nodes[id.index()].data {
                NodeData::Text(text) => Some((id, text.clone())),
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Register an observer for changes at (or, with `subtree`, beneath) `target`.
    pub fn observe(
        &self,
        target: NodeId,
        options: ObserveOptions,
        observer: Arc<dyn MutationObserver>,
    ) -> ObserverHandle {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.write().push(Registration {
            id,
            target,
            options,
            observer,
        });
        ObserverHandle {
            id,
            document: self.clone(),
        }
    }

    pub(crate) fn unobserve(&self, id: ObserverId) {
        self.inner.observers.write().retain(|r| r.id != id);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }

    fn notify(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }

        let deliveries: Vec<(Arc<dyn MutationObserver>, Vec<MutationRecord>)> = {
            let tree = self.inner.tree.read();
            let observers = self.inner.observers.read();
            observers
                .iter()
                .filter_map(|reg| {
                    let matching: Vec<MutationRecord> = records
                        .iter()
                        .filter(|r| {
                            reg.options.wants(r.kind)
                                && (r.target == reg.target
                                    || (reg.options.subtree
                                        && tree.is_inclusive_ancestor(reg.target, r.target)))
                        })
                        .cloned()
                        .collect();
                    (!matching.is_empty()).then(|| (Arc::clone(&reg.observer), matching))
                })
                .collect()
        };

        for (observer, batch) in deliveries {
            trace!(target: "glossa::dom", "delivering {} mutation record(s)", batch.len());
            observer.on_mutations(&batch, self);
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn add_event_listener(&self, node: NodeId, event: &str, listener: Listener) {
        self.inner
            .listeners
            .write()
            .entry((node, event.to_string()))
            .or_default()
            .push(listener);
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(&(node, event.to_string()))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Invoke the listeners registered on `node` for `event`; returns how many ran.
    pub fn dispatch_event(&self, node: NodeId, event: &str) -> usize {
        let listeners = self
            .inner
            .listeners
            .read()
            .get(&(node, event.to_string()))
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener(self, node);
        }
        listeners.len()
    }
}
