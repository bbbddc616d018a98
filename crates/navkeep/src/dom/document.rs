//! Arena-backed host document model.
//!
//! A [`Document`] owns its nodes; [`Node`] is a cheap `(document, id)`
//! handle. `<iframe>` elements may embed another document, which is how the
//! frame tree is formed. Structural and attribute changes are reported to
//! registered [`MutationObserver`](super::MutationObserver)s, and activation
//! (`click`) and scroll-settle events are dispatched to plain listeners.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::mutation::{self, MutationKind, MutationRecord, Registration};
use super::selector::{ComplexSelector, SelectorList};
use crate::result::{NavkeepError, NavkeepResult};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Document`].
///
/// Identities are never reused within a process but carry no meaning
/// across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Raw numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Index of a node inside its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

pub(crate) const DOCUMENT_NODE: NodeId = NodeId(0);

type Listener = Rc<dyn Fn(&Node)>;

/// Handle returned by [`Document::add_scroll_end_listener`], used to remove
/// the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// How a programmatic scroll should be animated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Jump immediately
    #[default]
    Auto,
    /// Animate towards the target
    Smooth,
}

/// Scroll geometry of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    /// Current vertical offset
    #[serde(default)]
    pub scroll_top: f64,
    /// Full content height
    #[serde(default)]
    pub scroll_height: f64,
    /// Visible height
    #[serde(default)]
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Metrics at offset zero
    #[must_use]
    pub const fn new(scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top: 0.0,
            scroll_height,
            client_height,
        }
    }

    /// Largest reachable `scroll_top`
    #[must_use]
    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Whether content overflows the visible area
    #[must_use]
    pub fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

pub(crate) struct ElementData {
    pub(crate) tag_name: String,
    attrs: Vec<(String, String)>,
    content_document: Option<Document>,
    scroll: ScrollMetrics,
}

impl ElementData {
    fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: Vec::new(),
            content_document: None,
            scroll: ScrollMetrics::default(),
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    click_listeners: Vec<Listener>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            click_listeners: Vec::new(),
        }
    }

    pub(crate) fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }
}

// =============================================================================
// ARENA HELPERS
// =============================================================================

pub(crate) fn parent_element(nodes: &[NodeData], id: NodeId) -> Option<NodeId> {
    nodes[id.0]
        .parent
        .filter(|parent| nodes[parent.0].element().is_some())
}

pub(crate) fn element_children(nodes: &[NodeData], id: NodeId) -> Vec<NodeId> {
    nodes[id.0]
        .children
        .iter()
        .copied()
        .filter(|child| nodes[child.0].element().is_some())
        .collect()
}

/// Element siblings of `id`, including itself, in tree order
pub(crate) fn sibling_elements(nodes: &[NodeData], id: NodeId) -> Vec<NodeId> {
    match nodes[id.0].parent {
        Some(parent) => element_children(nodes, parent),
        None => vec![id],
    }
}

pub(crate) fn previous_element_sibling(nodes: &[NodeData], id: NodeId) -> Option<NodeId> {
    let siblings = sibling_elements(nodes, id);
    let pos = siblings.iter().position(|sibling| *sibling == id)?;
    pos.checked_sub(1).map(|prev| siblings[prev])
}

pub(crate) fn is_inclusive_ancestor(nodes: &[NodeData], ancestor: NodeId, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        cursor = nodes[current.0].parent;
    }
    false
}

/// Elements strictly below `scope`, in pre-order
fn descendant_elements(nodes: &[NodeData], scope: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = nodes[scope.0].children.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        if nodes[current.0].element().is_some() {
            out.push(current);
        }
        stack.extend(nodes[current.0].children.iter().rev().copied());
    }
    out
}

// =============================================================================
// DOCUMENT
// =============================================================================

pub(crate) struct DocumentInner {
    id: DocumentId,
    pub(crate) nodes: RefCell<Vec<NodeData>>,
    frame_element: RefCell<Option<(Weak<DocumentInner>, NodeId)>>,
    pub(crate) registrations: RefCell<Vec<Registration>>,
    scroll_end_listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
}

/// A document: the root of one node tree in the frame tree
#[derive(Clone)]
pub struct Document {
    pub(crate) inner: Rc<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("nodes", &self.inner.nodes.borrow().len())
            .finish()
    }
}

impl Document {
    /// Create an empty document (only the document node)
    #[must_use]
    pub fn new() -> Self {
        let id = DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Rc::new(DocumentInner {
                id,
                nodes: RefCell::new(vec![NodeData::new(NodeKind::Document)]),
                frame_element: RefCell::new(None),
                registrations: RefCell::new(Vec::new()),
                scroll_end_listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Create a document with an `html > (head, body)` skeleton
    #[must_use]
    pub fn with_body() -> Self {
        let doc = Self::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(DOCUMENT_NODE, html.id);
        doc.link(html.id, head.id);
        doc.link(html.id, body.id);
        doc
    }

    pub(crate) fn from_weak(weak: &Weak<DocumentInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn downgrade(&self) -> Weak<DocumentInner> {
        Rc::downgrade(&self.inner)
    }

    /// Identity of this document
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    /// Whether two handles refer to the same document
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn handle(&self, id: NodeId) -> Node {
        Node {
            document: self.clone(),
            id,
        }
    }

    /// The document node itself
    #[must_use]
    pub fn node(&self) -> Node {
        self.handle(DOCUMENT_NODE)
    }

    /// The root element (usually `<html>`)
    #[must_use]
    pub fn document_element(&self) -> Option<Node> {
        let nodes = self.inner.nodes.borrow();
        element_children(&nodes, DOCUMENT_NODE)
            .first()
            .map(|id| self.handle(*id))
    }

    /// The `<body>` element, if the document has rendered one
    #[must_use]
    pub fn body(&self) -> Option<Node> {
        let root = self.document_element()?;
        root.children()
            .into_iter()
            .find(|child| child.tag_name().as_deref() == Some("body"))
    }

    /// Create a detached element owned by this document
    #[must_use]
    pub fn create_element(&self, tag_name: &str) -> Node {
        self.push_node(NodeKind::Element(ElementData::new(tag_name)))
    }

    /// Create a detached text node owned by this document
    #[must_use]
    pub fn create_text_node(&self, text: &str) -> Node {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    fn push_node(&self, kind: NodeKind) -> Node {
        let mut nodes = self.inner.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(NodeData::new(kind));
        drop(nodes);
        self.handle(id)
    }

    /// Attach `child` under `parent` without validation or notification
    fn link(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.inner.nodes.borrow_mut();
        nodes[child.0].parent = Some(parent);
        nodes[parent.0].children.push(child);
    }

    /// First element matching `selector`, in tree order
    pub fn query_selector(&self, selector: &str) -> NavkeepResult<Option<Node>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// All elements matching `selector`, in tree order
    pub fn query_selector_all(&self, selector: &str) -> NavkeepResult<Vec<Node>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.select(&list))
    }

    /// Evaluate an already parsed selector list against this document
    #[must_use]
    pub fn select(&self, list: &SelectorList) -> Vec<Node> {
        self.select_in(DOCUMENT_NODE, |nodes, id| list.matches(nodes, id))
    }

    pub(crate) fn select_complex(&self, selector: &ComplexSelector) -> Vec<Node> {
        self.select_in(DOCUMENT_NODE, |nodes, id| selector.matches(nodes, id))
    }

    fn select_in(&self, scope: NodeId, predicate: impl Fn(&[NodeData], NodeId) -> bool) -> Vec<Node> {
        let nodes = self.inner.nodes.borrow();
        descendant_elements(&nodes, scope)
            .into_iter()
            .filter(|id| predicate(&nodes, *id))
            .map(|id| self.handle(id))
            .collect()
    }

    /// Connected `<iframe>` elements, in tree order
    #[must_use]
    pub fn iframes(&self) -> Vec<Node> {
        self.select_in(DOCUMENT_NODE, |nodes, id| {
            nodes[id.0]
                .element()
                .is_some_and(|element| element.tag_name == "iframe")
        })
    }

    /// The `<iframe>` element embedding this document, if any
    #[must_use]
    pub fn frame_element(&self) -> Option<Node> {
        let frame = self.inner.frame_element.borrow();
        let (weak, id) = frame.as_ref()?;
        Self::from_weak(weak).map(|doc| doc.handle(*id))
    }

    /// Register a listener for scroll-settle (`scrollend`) events on any
    /// element of this document
    pub fn add_scroll_end_listener(&self, listener: impl Fn(&Node) + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner
            .scroll_end_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Remove a scroll-settle listener; false if it was already gone
    pub fn remove_scroll_end_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.scroll_end_listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered scroll-settle listeners
    #[must_use]
    pub fn scroll_end_listener_count(&self) -> usize {
        self.inner.scroll_end_listeners.borrow().len()
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Handle to a node in a [`Document`]
#[derive(Clone)]
pub struct Node {
    document: Document,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.document.ptr_eq(&other.document)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document.id().hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}:{} {})", self.document.id(), self.id.0, self.describe())
    }
}

impl Node {
    /// Owning document
    #[must_use]
    pub const fn owner_document(&self) -> &Document {
        &self.document
    }

    /// Arena id within the owning document
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        let nodes = self.document.inner.nodes.borrow();
        f(&nodes[self.id.0])
    }

    fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> NavkeepResult<R> {
        let mut nodes = self.document.inner.nodes.borrow_mut();
        nodes[self.id.0]
            .element_mut()
            .map(f)
            .ok_or_else(|| NavkeepError::NotAnElement {
                message: format!("node {} of {}", self.id.0, self.document.id()),
            })
    }

    /// Whether this is an element node
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.with_data(|data| data.element().is_some())
    }

    /// Whether this is the document node
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.with_data(|data| matches!(data.kind, NodeKind::Document))
    }

    /// Lowercased tag name for elements
    #[must_use]
    pub fn tag_name(&self) -> Option<String> {
        self.with_data(|data| data.element().map(|e| e.tag_name.clone()))
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_data(|data| data.element()?.attr(name).map(str::to_string))
    }

    /// Set an attribute, queuing an attributes mutation
    pub fn set_attribute(&self, name: &str, value: &str) -> NavkeepResult<()> {
        let name = name.to_ascii_lowercase();
        self.with_element_mut(|element| {
            match element.attrs.iter_mut().find(|(key, _)| *key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => element.attrs.push((name.clone(), value.to_string())),
            }
        })?;
        mutation::queue_mutation(
            &self.document,
            MutationRecord {
                kind: MutationKind::Attributes,
                target: self.clone(),
                added_nodes: Vec::new(),
                removed_nodes: Vec::new(),
                attribute_name: Some(name),
            },
        );
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    #[must_use]
    pub fn text_content(&self) -> String {
        let nodes = self.document.inner.nodes.borrow();
        let mut out = String::new();
        let mut stack = vec![self.id];
        while let Some(current) = stack.pop() {
            if let NodeKind::Text(text) = &nodes[current.0].kind {
                out.push_str(text);
            }
            stack.extend(nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    /// Parent node (element or document)
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.with_data(|data| data.parent)
            .map(|id| self.document.handle(id))
    }

    /// Parent, if it is an element
    #[must_use]
    pub fn parent_element(&self) -> Option<Node> {
        let nodes = self.document.inner.nodes.borrow();
        parent_element(&nodes, self.id).map(|id| self.document.handle(id))
    }

    /// Element children in tree order
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        let nodes = self.document.inner.nodes.borrow();
        element_children(&nodes, self.id)
            .into_iter()
            .map(|id| self.document.handle(id))
            .collect()
    }

    /// Append `child` as the last child, moving it if already attached.
    ///
    /// # Errors
    ///
    /// Fails with [`NavkeepError::HierarchyRequest`] when the nodes belong
    /// to different documents, when `self` cannot have children, or when
    /// `child` is an inclusive ancestor of `self`.
    pub fn append_child(&self, child: &Node) -> NavkeepResult<()> {
        if !self.document.ptr_eq(&child.document) {
            return Err(NavkeepError::hierarchy(
                "cannot append a node owned by another document",
            ));
        }
        let previous_parent = {
            let nodes = self.document.inner.nodes.borrow();
            if matches!(nodes[self.id.0].kind, NodeKind::Text(_)) {
                return Err(NavkeepError::hierarchy("text nodes cannot have children"));
            }
            if matches!(nodes[child.id.0].kind, NodeKind::Document) {
                return Err(NavkeepError::hierarchy("cannot append the document node"));
            }
            if is_inclusive_ancestor(&nodes, child.id, self.id) {
                return Err(NavkeepError::hierarchy("cannot append an ancestor"));
            }
            nodes[child.id.0].parent
        };

        if let Some(old_parent) = previous_parent {
            self.document.handle(old_parent).remove_child(child)?;
        }
        self.document.link(self.id, child.id);
        mutation::queue_mutation(
            &self.document,
            MutationRecord {
                kind: MutationKind::ChildList,
                target: self.clone(),
                added_nodes: vec![child.clone()],
                removed_nodes: Vec::new(),
                attribute_name: None,
            },
        );
        Ok(())
    }

    /// Detach `child` from this node
    pub fn remove_child(&self, child: &Node) -> NavkeepResult<()> {
        {
            let mut nodes = self.document.inner.nodes.borrow_mut();
            if !self.document.ptr_eq(&child.document) || nodes[child.id.0].parent != Some(self.id)
            {
                return Err(NavkeepError::hierarchy("node is not a child of this node"));
            }
            nodes[self.id.0].children.retain(|id| *id != child.id);
            nodes[child.id.0].parent = None;
        }
        mutation::queue_mutation(
            &self.document,
            MutationRecord {
                kind: MutationKind::ChildList,
                target: self.clone(),
                added_nodes: Vec::new(),
                removed_nodes: vec![child.clone()],
                attribute_name: None,
            },
        );
        Ok(())
    }

    /// Detach this node from its parent; a no-op for detached nodes
    pub fn remove(&self) -> NavkeepResult<()> {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => Ok(()),
        }
    }

    /// Whether the node is reachable from its document node
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let nodes = self.document.inner.nodes.borrow();
        is_inclusive_ancestor(&nodes, DOCUMENT_NODE, self.id)
    }

    /// Whether this element matches `selector`
    pub fn matches(&self, selector: &str) -> NavkeepResult<bool> {
        let list = SelectorList::parse(selector)?;
        let nodes = self.document.inner.nodes.borrow();
        Ok(list.matches(&nodes, self.id))
    }

    /// Descendant elements matching `selector`, in tree order
    pub fn query_selector_all(&self, selector: &str) -> NavkeepResult<Vec<Node>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .document
            .select_in(self.id, |nodes, id| list.matches(nodes, id)))
    }

    /// Embedded document of an `<iframe>`.
    ///
    /// `None` when the frame has not loaded or its document is inaccessible.
    #[must_use]
    pub fn content_document(&self) -> Option<Document> {
        self.with_data(|data| data.element()?.content_document.clone())
    }

    /// Load (or unload, with `None`) the embedded document of an `<iframe>`.
    ///
    /// Loading does not queue a mutation in this document.
    pub fn set_content_document(&self, document: Option<Document>) -> NavkeepResult<()> {
        if self.tag_name().as_deref() != Some("iframe") {
            return Err(NavkeepError::hierarchy(
                "only iframe elements embed documents",
            ));
        }
        if let Some(doc) = &document {
            if doc.ptr_eq(&self.document) {
                return Err(NavkeepError::hierarchy("a document cannot embed itself"));
            }
        }

        let previous = self.with_element_mut(|element| {
            std::mem::replace(&mut element.content_document, document.clone())
        })?;
        if let Some(old) = previous {
            *old.inner.frame_element.borrow_mut() = None;
        }
        if let Some(new) = document {
            *new.inner.frame_element.borrow_mut() = Some((self.document.downgrade(), self.id));
        }
        Ok(())
    }

    /// Current scroll geometry (all zero for non-elements)
    #[must_use]
    pub fn scroll_metrics(&self) -> ScrollMetrics {
        self.with_data(|data| data.element().map(|e| e.scroll).unwrap_or_default())
    }

    /// Replace the scroll geometry without dispatching events
    pub fn set_scroll_metrics(&self, metrics: ScrollMetrics) -> NavkeepResult<()> {
        self.with_element_mut(|element| element.scroll = metrics)
    }

    /// Current vertical scroll offset
    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.scroll_metrics().scroll_top
    }

    /// Scroll to `top` (clamped to the scrollable extent), then dispatch a
    /// scroll-settle event. Returns the applied offset.
    pub fn scroll_to(&self, top: f64, behavior: ScrollBehavior) -> NavkeepResult<f64> {
        let applied = self.with_element_mut(|element| {
            let clamped = top.clamp(0.0, element.scroll.max_scroll_top());
            element.scroll.scroll_top = clamped;
            clamped
        })?;
        tracing::trace!(node = ?self, top = applied, ?behavior, "scrolled");
        self.dispatch_scroll_end();
        Ok(applied)
    }

    /// Dispatch a scroll-settle event for this element to its document's
    /// listeners
    pub fn dispatch_scroll_end(&self) {
        let listeners: Vec<Listener> = self
            .document
            .inner
            .scroll_end_listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(self);
        }
        mutation::deliver_mutations();
    }

    /// Register an activation (`click`) listener on this element
    pub fn add_click_listener(&self, listener: impl Fn(&Node) + 'static) -> NavkeepResult<()> {
        let mut nodes = self.document.inner.nodes.borrow_mut();
        let data = &mut nodes[self.id.0];
        if data.element().is_none() {
            return Err(NavkeepError::NotAnElement {
                message: "click listeners attach to elements".to_string(),
            });
        }
        data.click_listeners.push(Rc::new(listener));
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn click_listener_count(&self) -> usize {
        self.with_data(|data| data.click_listeners.len())
    }

    /// Run the element's activation behaviour: invoke click listeners in
    /// registration order, then deliver pending mutation records
    pub fn click(&self) {
        let listeners: Vec<Listener> = self.with_data(|data| data.click_listeners.clone());
        for listener in listeners {
            listener(self);
        }
        mutation::deliver_mutations();
    }

    /// Short human-readable form such as `a#home.tab.active`
    #[must_use]
    pub fn describe(&self) -> String {
        self.with_data(|data| match &data.kind {
            NodeKind::Document => "#document".to_string(),
            NodeKind::Text(_) => "#text".to_string(),
            NodeKind::Element(element) => {
                let mut out = element.tag_name.clone();
                if let Some(id) = element.attr("id") {
                    out.push('#');
                    out.push_str(id);
                }
                if let Some(classes) = element.attr("class") {
                    for class in classes.split_whitespace() {
                        out.push('.');
                        out.push_str(class);
                    }
                }
                out
            }
        })
    }
}
