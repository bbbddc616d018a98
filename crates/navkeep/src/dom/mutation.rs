//! Mutation observers for the host document model.
//!
//! Records are buffered per observer when a tree or attribute change
//! happens and handed to callbacks at an explicit checkpoint,
//! [`deliver_mutations`]. The checkpoint runs automatically after
//! [`Node::click`](super::Node::click) and scroll-settle dispatch, and can be
//! called directly by code that mutates documents outside those paths.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::document::{self, Document, DocumentInner, Node, NodeId};

thread_local! {
    static PENDING: RefCell<Vec<Weak<ObserverInner>>> = const { RefCell::new(Vec::new()) };
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// Which changes an observer registration is interested in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationObserverInit {
    /// Child insertions and removals
    #[serde(default)]
    pub child_list: bool,
    /// Extend the registration to all descendants of the target
    #[serde(default)]
    pub subtree: bool,
    /// Attribute changes
    #[serde(default)]
    pub attributes: bool,
}

impl MutationObserverInit {
    /// `{ childList: true, subtree: true }`
    #[must_use]
    pub const fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: false,
        }
    }

    /// Also report attribute changes
    #[must_use]
    pub const fn with_attributes(mut self, attributes: bool) -> Self {
        self.attributes = attributes;
        self
    }

    const fn wants(self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => self.attributes,
        }
    }
}

/// Kind of a mutation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    /// Children were added or removed
    ChildList,
    /// An attribute changed
    Attributes,
}

/// One observed change
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// What changed
    pub kind: MutationKind,
    /// Parent (child list) or element (attributes) that changed
    pub target: Node,
    /// Inserted nodes
    pub added_nodes: Vec<Node>,
    /// Removed nodes
    pub removed_nodes: Vec<Node>,
    /// Changed attribute, for attribute records
    pub attribute_name: Option<String>,
}

pub(crate) struct Registration {
    observer: Weak<ObserverInner>,
    target: NodeId,
    options: MutationObserverInit,
}

type Callback = Rc<dyn Fn(Vec<MutationRecord>, &MutationObserver)>;

pub(crate) struct ObserverInner {
    callback: Callback,
    records: RefCell<Vec<MutationRecord>>,
    documents: RefCell<Vec<Weak<DocumentInner>>>,
}

/// Observer handle; clones share the same record queue
#[derive(Clone)]
pub struct MutationObserver {
    inner: Rc<ObserverInner>,
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("queued", &self.inner.records.borrow().len())
            .field("documents", &self.inner.documents.borrow().len())
            .finish()
    }
}

impl MutationObserver {
    /// Create an observer; `callback` receives each delivered batch
    pub fn new(callback: impl Fn(Vec<MutationRecord>, &Self) + 'static) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                callback: Rc::new(callback),
                records: RefCell::new(Vec::new()),
                documents: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register interest in `target`. Observing the same target again
    /// replaces the previous options.
    pub fn observe(&self, target: &Node, options: MutationObserverInit) {
        let document = target.owner_document();
        let mut registrations = document.inner.registrations.borrow_mut();
        let existing = registrations.iter_mut().find(|reg| {
            reg.target == target.id() && Weak::ptr_eq(&reg.observer, &Rc::downgrade(&self.inner))
        });
        match existing {
            Some(reg) => reg.options = options,
            None => registrations.push(Registration {
                observer: Rc::downgrade(&self.inner),
                target: target.id(),
                options,
            }),
        }
        drop(registrations);

        let weak_doc = document.downgrade();
        let mut documents = self.inner.documents.borrow_mut();
        if !documents.iter().any(|doc| Weak::ptr_eq(doc, &weak_doc)) {
            documents.push(weak_doc);
        }
    }

    /// Drop every registration and discard queued records
    pub fn disconnect(&self) {
        let me = Rc::downgrade(&self.inner);
        for weak_doc in self.inner.documents.borrow_mut().drain(..) {
            if let Some(doc) = Document::from_weak(&weak_doc) {
                doc.inner
                    .registrations
                    .borrow_mut()
                    .retain(|reg| !Weak::ptr_eq(&reg.observer, &me));
            }
        }
        self.inner.records.borrow_mut().clear();
    }

    /// Remove and return queued, undelivered records
    #[must_use]
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.inner.records.borrow_mut())
    }

    /// Copy of the queued, undelivered records; the queue is left intact
    #[must_use]
    pub fn pending_records(&self) -> Vec<MutationRecord> {
        self.inner.records.borrow().clone()
    }

    /// Whether this observer has a registration in `document`
    #[must_use]
    pub fn is_observing(&self, document: &Document) -> bool {
        let me = Rc::downgrade(&self.inner);
        document
            .inner
            .registrations
            .borrow()
            .iter()
            .any(|reg| Weak::ptr_eq(&reg.observer, &me))
    }
}

/// Queue `record` for every observer whose registration covers its target
pub(crate) fn queue_mutation(document: &Document, record: MutationRecord) {
    let interested = {
        let nodes = document.inner.nodes.borrow();
        let mut registrations = document.inner.registrations.borrow_mut();
        registrations.retain(|reg| reg.observer.strong_count() > 0);

        let target = record.target.id();
        let mut out: Vec<Rc<ObserverInner>> = Vec::new();
        for reg in registrations.iter() {
            if !reg.options.wants(record.kind) {
                continue;
            }
            let covered = reg.target == target
                || (reg.options.subtree && document::is_inclusive_ancestor(&nodes, reg.target, target));
            if !covered {
                continue;
            }
            if let Some(observer) = reg.observer.upgrade() {
                if !out.iter().any(|seen| Rc::ptr_eq(seen, &observer)) {
                    out.push(observer);
                }
            }
        }
        out
    };

    for observer in interested {
        observer.records.borrow_mut().push(record.clone());
        let weak = Rc::downgrade(&observer);
        PENDING.with(|pending| {
            let mut pending = pending.borrow_mut();
            if !pending.iter().any(|queued| Weak::ptr_eq(queued, &weak)) {
                pending.push(weak);
            }
        });
    }
}

struct DeliveryGuard;

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(false));
    }
}

/// Deliver queued records to their observers' callbacks.
///
/// Runs until no observer has pending records, so mutations made by a
/// callback are delivered within the same checkpoint. Nested calls made from
/// inside a callback return immediately.
pub fn deliver_mutations() {
    if DELIVERING.with(|flag| flag.replace(true)) {
        return;
    }
    let _guard = DeliveryGuard;

    loop {
        let batch = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if batch.is_empty() {
            break;
        }
        for weak in batch {
            let Some(inner) = weak.upgrade() else {
                continue;
            };
            let records = std::mem::take(&mut *inner.records.borrow_mut());
            if records.is_empty() {
                continue;
            }
            let callback = Rc::clone(&inner.callback);
            let observer = MutationObserver { inner };
            callback(records, &observer);
        }
    }
}
