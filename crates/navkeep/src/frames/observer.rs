//! Mutation observation across a dynamic tree of iframe documents.
//!
//! [`CrossFrameObserver`] observes a root and every frame document reachable
//! from it. Each tracked document gets two observers of its own: a frame
//! watch that extends tracking to newly inserted or newly loaded frames, and
//! the caller-facing observer configured with the caller's options.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::dom::{Document, DocumentId, MutationObserver, MutationObserverInit, MutationRecord, Node};

type MutationCallback = Rc<dyn Fn(Vec<MutationRecord>)>;
type DiscoveryCallback = Rc<dyn Fn(&Document)>;

struct TrackedDocument {
    document: Document,
    frame_watch: MutationObserver,
    observer: MutationObserver,
}

struct EngineInner {
    callback: MutationCallback,
    discovery: RefCell<Vec<DiscoveryCallback>>,
    tracked: RefCell<Vec<TrackedDocument>>,
    options: Cell<MutationObserverInit>,
    connected: Cell<bool>,
}

impl EngineInner {
    fn release_all(&self) {
        let tracked = std::mem::take(&mut *self.tracked.borrow_mut());
        for entry in &tracked {
            entry.frame_watch.disconnect();
            entry.observer.disconnect();
        }
        self.connected.set(false);
        if !tracked.is_empty() {
            debug!(documents = tracked.len(), "cross-frame observer disconnected");
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Observes a document and all of its (nested) frame documents as one
#[derive(Clone)]
pub struct CrossFrameObserver {
    inner: Rc<EngineInner>,
}

impl fmt::Debug for CrossFrameObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossFrameObserver")
            .field("connected", &self.inner.connected.get())
            .field("tracked", &self.inner.tracked.borrow().len())
            .finish()
    }
}

impl CrossFrameObserver {
    /// Create an engine; `callback` receives mutation batches from every
    /// tracked document
    pub fn new(callback: impl Fn(Vec<MutationRecord>) + 'static) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                callback: Rc::new(callback),
                discovery: RefCell::new(Vec::new()),
                tracked: RefCell::new(Vec::new()),
                options: Cell::new(MutationObserverInit::child_list_subtree()),
                connected: Cell::new(false),
            }),
        }
    }

    /// Register a listener fired once for every newly tracked document,
    /// including the root
    pub fn on_document_discovered(&self, listener: impl Fn(&Document) + 'static) {
        self.inner.discovery.borrow_mut().push(Rc::new(listener));
    }

    /// Start observing `root` and every frame document under it.
    ///
    /// A no-op when `root`'s document is already tracked.
    pub fn observe(&self, root: &Node, options: MutationObserverInit) {
        let document = root.owner_document().clone();
        if self.is_tracking(document.id()) {
            trace!(document = %document.id(), "document already observed");
            return;
        }
        self.inner.options.set(options);
        self.inner.connected.set(true);
        if self.track(&document, root) {
            self.scan_frames(&document);
        }
    }

    /// Stop observing everything and forget all tracked documents
    pub fn disconnect(&self) {
        self.inner.release_all();
    }

    /// Undelivered records from every tracked document, in discovery order.
    ///
    /// Nothing is consumed: the same records still reach the callback at the
    /// next [`deliver_mutations`](crate::dom::deliver_mutations) checkpoint.
    #[must_use]
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.inner
            .tracked
            .borrow()
            .iter()
            .flat_map(|entry| entry.observer.pending_records())
            .collect()
    }

    /// Whether `observe` has been called since the last disconnect
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// Tracked documents in discovery order
    #[must_use]
    pub fn tracked_documents(&self) -> Vec<Document> {
        self.inner
            .tracked
            .borrow()
            .iter()
            .map(|entry| entry.document.clone())
            .collect()
    }

    fn is_tracking(&self, id: DocumentId) -> bool {
        self.inner
            .tracked
            .borrow()
            .iter()
            .any(|entry| entry.document.id() == id)
    }

    /// Track one document; returns false if already tracked
    fn track(&self, document: &Document, target: &Node) -> bool {
        if self.is_tracking(document.id()) {
            return false;
        }

        let weak = Rc::downgrade(&self.inner);
        let frame_watch = MutationObserver::new(move |records, _| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.connected.get() {
                return;
            }
            let engine = CrossFrameObserver { inner };
            for document in changed_documents(&records) {
                engine.scan_frames(&document);
            }
        });
        frame_watch.observe(&document.node(), MutationObserverInit::child_list_subtree());

        let weak = Rc::downgrade(&self.inner);
        let observer = MutationObserver::new(move |records, _| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.connected.get() {
                let callback = Rc::clone(&inner.callback);
                callback(records);
            }
        });
        observer.observe(target, self.inner.options.get());

        self.inner.tracked.borrow_mut().push(TrackedDocument {
            document: document.clone(),
            frame_watch,
            observer,
        });
        debug!(document = %document.id(), "document discovered");

        let listeners: Vec<DiscoveryCallback> = self.inner.discovery.borrow().clone();
        for listener in listeners {
            listener(document);
        }
        true
    }

    /// Extend tracking to frame documents reachable from `start`.
    ///
    /// Frames without an accessible document, or whose document has not
    /// rendered a body yet, are skipped until a later mutation rescans.
    fn scan_frames(&self, start: &Document) {
        let mut work = vec![start.clone()];
        while let Some(document) = work.pop() {
            for frame in document.iframes() {
                let Some(content) = frame.content_document() else {
                    continue;
                };
                if content.body().is_none() {
                    trace!(document = %content.id(), "frame document has no body yet");
                    continue;
                }
                if self.track(&content, &content.node()) {
                    work.push(content);
                }
            }
        }
    }
}

fn changed_documents(records: &[MutationRecord]) -> Vec<Document> {
    let mut out: Vec<Document> = Vec::new();
    for record in records {
        let document = record.target.owner_document();
        if !out.contains(document) {
            out.push(document.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{deliver_mutations, DocumentFixture, ElementFixture};

    fn nested() -> Document {
        let level2 = DocumentFixture::new(vec![ElementFixture::new("p")]);
        let level1 = DocumentFixture::new(vec![ElementFixture::new("iframe").document(level2)]);
        DocumentFixture::new(vec![
            ElementFixture::new("iframe").document(level1),
            ElementFixture::new("iframe"),
        ])
        .build()
        .unwrap()
    }

    fn engine_with_log() -> (
        CrossFrameObserver,
        Rc<RefCell<Vec<MutationRecord>>>,
        Rc<RefCell<Vec<DocumentId>>>,
    ) {
        let records = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&records);
        let engine = CrossFrameObserver::new(move |batch| sink.borrow_mut().extend(batch));
        let discovered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&discovered);
        engine.on_document_discovered(move |doc| sink.borrow_mut().push(doc.id()));
        (engine, records, discovered)
    }

    #[test]
    fn test_observe_discovers_nested_frames() {
        let root = nested();
        let (engine, _, discovered) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());

        let level1 = root.iframes()[0].content_document().unwrap();
        let level2 = level1.iframes()[0].content_document().unwrap();
        assert_eq!(*discovered.borrow(), vec![root.id(), level1.id(), level2.id()]);
        assert_eq!(engine.tracked_documents(), vec![root, level1, level2]);
        assert!(engine.is_connected());
    }

    #[test]
    fn test_observe_is_idempotent_per_document() {
        let root = nested();
        let (engine, _, discovered) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        engine.observe(&root.body().unwrap(), MutationObserverInit::child_list_subtree());
        assert_eq!(discovered.borrow().len(), 3);
    }

    #[test]
    fn test_mutations_from_frames_reach_callback() {
        let root = nested();
        let (engine, records, _) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());

        let level1 = root.iframes()[0].content_document().unwrap();
        let level2 = level1.iframes()[0].content_document().unwrap();
        level2.body().unwrap().append_child(&level2.create_element("div")).unwrap();
        root.body().unwrap().append_child(&root.create_element("div")).unwrap();
        deliver_mutations();

        let records = records.borrow();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target.owner_document(), &level2);
    }

    #[test]
    fn test_inserted_frame_discovered_on_mutation() {
        let root = nested();
        let (engine, _, discovered) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());

        let late = DocumentFixture::new(vec![ElementFixture::new("span")])
            .build()
            .unwrap();
        let frame = root.create_element("iframe");
        frame.set_content_document(Some(late.clone())).unwrap();
        root.body().unwrap().append_child(&frame).unwrap();
        deliver_mutations();

        assert_eq!(discovered.borrow().last(), Some(&late.id()));
        assert_eq!(engine.tracked_documents().len(), 4);
    }

    #[test]
    fn test_unloaded_frame_retried_on_next_mutation() {
        let root = nested();
        let (engine, _, discovered) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        assert_eq!(discovered.borrow().len(), 3);

        // second iframe loads a document without a body, then renders one
        let empty = Document::new();
        root.iframes()[1].set_content_document(Some(empty.clone())).unwrap();
        root.body().unwrap().append_child(&root.create_element("div")).unwrap();
        deliver_mutations();
        assert_eq!(discovered.borrow().len(), 3);

        let html = empty.create_element("html");
        html.append_child(&empty.create_element("body")).unwrap();
        empty.node().append_child(&html).unwrap();
        root.body().unwrap().append_child(&root.create_element("div")).unwrap();
        deliver_mutations();
        assert_eq!(discovered.borrow().last(), Some(&empty.id()));
    }

    #[test]
    fn test_take_records_in_discovery_order() {
        let root = nested();
        let (engine, records, _) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        let level1 = root.iframes()[0].content_document().unwrap();

        level1.body().unwrap().append_child(&level1.create_element("a")).unwrap();
        root.body().unwrap().append_child(&root.create_element("b")).unwrap();
        let taken = engine.take_records();
        let tags: Vec<_> = taken
            .iter()
            .map(|r| r.added_nodes[0].tag_name().unwrap())
            .collect();
        assert_eq!(tags, vec!["b", "a"]);

        let again = engine.take_records();
        assert_eq!(again.len(), taken.len());
        assert_eq!(again[0].target, taken[0].target);
        assert_eq!(again[1].added_nodes, taken[1].added_nodes);

        deliver_mutations();
        let delivered = records.borrow();
        assert_eq!(delivered.len(), 2);
        assert!(engine.take_records().is_empty());
    }

    #[test]
    fn test_disconnect_releases_every_document() {
        let root = nested();
        let (engine, records, _) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        let docs = engine.tracked_documents();
        engine.disconnect();

        assert!(!engine.is_connected());
        assert!(engine.tracked_documents().is_empty());
        for doc in &docs {
            assert!(doc.inner.registrations.borrow().is_empty());
        }
        root.body().unwrap().append_child(&root.create_element("div")).unwrap();
        deliver_mutations();
        assert!(records.borrow().is_empty());
    }

    #[test]
    fn test_drop_releases_registrations() {
        let root = nested();
        let (engine, _, _) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        drop(engine);
        assert!(root.inner.registrations.borrow().is_empty());
    }

    #[test]
    fn test_reobserve_after_disconnect() {
        let root = nested();
        let (engine, _, discovered) = engine_with_log();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        engine.disconnect();
        engine.observe(&root.node(), MutationObserverInit::child_list_subtree());
        assert_eq!(discovered.borrow().len(), 6);
    }
}
