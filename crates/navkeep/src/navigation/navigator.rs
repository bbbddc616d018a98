//! The navigation state machine.
//!
//! A [`Navigator`] watches the frame tree through a [`CrossFrameObserver`],
//! walks the descriptor tree on every mutation batch, instruments matching
//! elements with click recorders, replays a persisted stack after a reload,
//! and tracks and restores scroll offsets.
//!
//! Everything runs on one thread. Detection passes and the restoration
//! deadline are `spawn_local` tasks, so [`NavigatorBuilder::start`] must be
//! called inside a [`tokio::task::LocalSet`]. Passes may interleave; they
//! share state only through the navigator, and every continuation re-checks
//! that the navigator is still alive and running.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use tokio::task::spawn_local;
use tracing::{debug, info, trace, warn};

use super::config::NavigatorConfig;
use super::descriptor::{resolve_path, NavElement, PORTAL_NAVIGATION};
use super::messenger::{NoopChannel, PrivilegedChannel};
use super::scroll::ScrollState;
use super::session::{MemoryStorage, SessionRecord, SessionStorage};
use super::stack::{NavEntry, NavigationStack};
use crate::dom::{
    Document, ListenerId, MutationObserverInit, MutationRecord, Node, ScrollBehavior,
};
use crate::frames::{
    global_query_selector, global_query_selector_all, global_selector, CrossFrameObserver,
    QueryMode,
};
use crate::result::{NavkeepError, NavkeepResult};

/// One-shot replay of the stack persisted by the previous page load
#[derive(Debug, Default)]
struct Replay {
    plan: Vec<NavEntry>,
    cursor: usize,
    abandoned: bool,
}

struct ReplayStep {
    index: usize,
    last: bool,
}

impl Replay {
    fn is_active(&self) -> bool {
        !self.abandoned && self.cursor < self.plan.len()
    }

    /// Claim the level at `depth` if it is the next one to replay
    fn claim(&mut self, depth: usize, selector: &str) -> Option<ReplayStep> {
        if !self.is_active() || self.cursor != depth {
            return None;
        }
        let entry = &self.plan[depth];
        if entry.selector != selector {
            return None;
        }
        let index = entry.index;
        self.cursor += 1;
        Some(ReplayStep {
            index,
            last: self.cursor == self.plan.len(),
        })
    }

    /// Give up on the remaining levels; true if any were left
    fn abandon(&mut self) -> bool {
        let was_active = self.is_active();
        self.abandoned = true;
        was_active
    }
}

struct NavState {
    stack: NavigationStack,
    replay: Replay,
    instrumented: HashMap<&'static str, Vec<Node>>,
    scroll: ScrollState,
}

struct NavigatorInner {
    me: Weak<NavigatorInner>,
    root: Document,
    config: NavigatorConfig,
    descriptor: &'static [NavElement],
    storage: Rc<dyn SessionStorage>,
    channel: Rc<dyn PrivilegedChannel>,
    engine: CrossFrameObserver,
    scroll_listeners: RefCell<Vec<(Document, ListenerId)>>,
    state: RefCell<NavState>,
    activating: Cell<bool>,
    torn_down: Cell<bool>,
    passes: Cell<u64>,
}

/// Builder for [`Navigator`]
pub struct NavigatorBuilder {
    root: Document,
    config: NavigatorConfig,
    descriptor: &'static [NavElement],
    storage: Rc<dyn SessionStorage>,
    channel: Rc<dyn PrivilegedChannel>,
}

impl fmt::Debug for NavigatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorBuilder")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NavigatorBuilder {
    /// Use `config`
    #[must_use]
    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a descriptor tree other than [`PORTAL_NAVIGATION`]
    #[must_use]
    pub const fn descriptor(mut self, descriptor: &'static [NavElement]) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Persist to `storage`
    #[must_use]
    pub fn storage(mut self, storage: impl SessionStorage + 'static) -> Self {
        self.storage = Rc::new(storage);
        self
    }

    /// Reach the privileged context through `channel`
    #[must_use]
    pub fn channel(mut self, channel: impl PrivilegedChannel + 'static) -> Self {
        self.channel = Rc::new(channel);
        self
    }

    /// Load the session record, start observing and run the first
    /// detection pass. Must be called within a `LocalSet`.
    #[must_use]
    pub fn start(self) -> Navigator {
        let record = SessionRecord::load(self.storage.as_ref(), &self.config.storage_key)
            .unwrap_or_default();
        let stack = checked_stack(self.descriptor, record.navigation_stack);
        let options = MutationObserverInit::child_list_subtree()
            .with_attributes(self.config.observe_attributes);

        let inner = Rc::new_cyclic(|me: &Weak<NavigatorInner>| {
            let weak = me.clone();
            let engine = CrossFrameObserver::new(move |records| on_mutations(&weak, &records));
            NavigatorInner {
                me: me.clone(),
                root: self.root,
                config: self.config,
                descriptor: self.descriptor,
                storage: self.storage,
                channel: self.channel,
                engine,
                scroll_listeners: RefCell::new(Vec::new()),
                state: RefCell::new(NavState {
                    replay: Replay {
                        plan: stack.entries().to_vec(),
                        ..Replay::default()
                    },
                    stack,
                    instrumented: HashMap::new(),
                    scroll: ScrollState::new(record.scroll_positions),
                }),
                activating: Cell::new(false),
                torn_down: Cell::new(false),
                passes: Cell::new(0),
            }
        });

        let weak = Rc::downgrade(&inner);
        inner.engine.on_document_discovered(move |document| {
            let Some(inner) = live(&weak) else {
                return;
            };
            let listener_weak = weak.clone();
            let id = document.add_scroll_end_listener(move |element| {
                if let Some(inner) = live(&listener_weak) {
                    inner.on_scroll_end(element);
                }
            });
            inner
                .scroll_listeners
                .borrow_mut()
                .push((document.clone(), id));
        });
        inner.engine.observe(&inner.root.node(), options);

        let (plan_len, scroll_entries) = {
            let state = inner.state.borrow();
            (state.replay.plan.len(), state.scroll.positions().len())
        };
        info!(
            root = %inner.root.id(),
            replay_levels = plan_len,
            scroll_entries,
            "navigator started"
        );

        spawn_local(detection_pass(Rc::downgrade(&inner)));
        if plan_len == 0 {
            inner.begin_scroll_restore();
        }
        Navigator { inner }
    }
}

/// Navigation recorder and restorer for one page load
pub struct Navigator {
    inner: Rc<NavigatorInner>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("root", &self.inner.root)
            .field("stack", &self.inner.state.borrow().stack)
            .field("running", &!self.inner.torn_down.get())
            .finish()
    }
}

impl Navigator {
    /// Builder with default configuration, the portal descriptor tree,
    /// fresh in-memory storage and a channel that confirms immediately
    #[must_use]
    pub fn builder(root: Document) -> NavigatorBuilder {
        NavigatorBuilder {
            root,
            config: NavigatorConfig::default(),
            descriptor: PORTAL_NAVIGATION,
            storage: Rc::new(MemoryStorage::new()),
            channel: Rc::new(NoopChannel),
        }
    }

    /// Current navigation stack
    #[must_use]
    pub fn stack(&self) -> NavigationStack {
        self.inner.state.borrow().stack.clone()
    }

    /// Recorded scroll offsets by derived selector
    #[must_use]
    pub fn scroll_positions(&self) -> BTreeMap<String, f64> {
        self.inner.state.borrow().scroll.positions().clone()
    }

    /// Number of replayed levels so far
    #[must_use]
    pub fn replay_cursor(&self) -> usize {
        self.inner.state.borrow().replay.cursor
    }

    /// Whether levels remain to be replayed
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.inner.state.borrow().replay.is_active()
    }

    /// Whether scroll restoration is waiting on entries
    #[must_use]
    pub fn is_restoring_scroll(&self) -> bool {
        self.inner.state.borrow().scroll.is_restoring()
    }

    /// Number of elements carrying a click recorder for `selector`
    #[must_use]
    pub fn instrumented(&self, selector: &str) -> usize {
        self.inner
            .state
            .borrow()
            .instrumented
            .get(selector)
            .map_or(0, Vec::len)
    }

    /// The underlying observation engine
    #[must_use]
    pub fn engine(&self) -> &CrossFrameObserver {
        &self.inner.engine
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &NavigatorConfig {
        &self.inner.config
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.torn_down.get()
    }

    /// Stop observing; in-flight passes and timers become no-ops and
    /// installed click recorders stop recording
    pub fn shutdown(&self) {
        if self.inner.torn_down.replace(true) {
            return;
        }
        self.inner.engine.disconnect();
        let listeners = std::mem::take(&mut *self.inner.scroll_listeners.borrow_mut());
        for (document, id) in &listeners {
            document.remove_scroll_end_listener(*id);
        }
        info!(
            root = %self.inner.root.id(),
            scroll_listeners = listeners.len(),
            "navigator shut down"
        );
    }
}

/// Drop a persisted stack that no longer fits the descriptor tree
fn checked_stack(descriptor: &'static [NavElement], stack: NavigationStack) -> NavigationStack {
    let selectors: Vec<&str> = stack.entries().iter().map(|e| e.selector.as_str()).collect();
    if resolve_path(descriptor, &selectors).is_some() {
        stack
    } else {
        warn!(
            levels = stack.len(),
            "persisted stack does not follow the descriptor tree, discarding"
        );
        NavigationStack::default()
    }
}

fn live(weak: &Weak<NavigatorInner>) -> Option<Rc<NavigatorInner>> {
    weak.upgrade().filter(|inner| !inner.torn_down.get())
}

fn on_mutations(weak: &Weak<NavigatorInner>, records: &[MutationRecord]) {
    let Some(inner) = live(weak) else {
        return;
    };
    trace!(records = records.len(), "mutation batch");
    spawn_local(detection_pass(weak.clone()));
    if inner.state.borrow().scroll.is_restoring() {
        inner.attempt_scroll_restore();
    }
}

/// Walk the descriptor tree depth-first, descending only below levels that
/// currently match
async fn detection_pass(weak: Weak<NavigatorInner>) {
    let Some(inner) = live(&weak) else {
        return;
    };
    let pass = inner.passes.get() + 1;
    inner.passes.set(pass);
    let settle = inner.config.settle_delay();
    let mut work: Vec<(&'static NavElement, Vec<&'static str>)> = inner
        .descriptor
        .iter()
        .rev()
        .map(|node| (node, vec![node.selector]))
        .collect();
    drop(inner);
    trace!(pass, "detection pass started");

    while let Some((node, path)) = work.pop() {
        let depth = path.len() - 1;
        let Some(inner) = live(&weak) else {
            return;
        };
        if inner.matches(node.selector).is_empty() {
            continue;
        }
        drop(inner);

        tokio::time::sleep(settle).await;
        let Some(inner) = live(&weak) else {
            return;
        };
        if inner.matches(node.selector).is_empty() {
            continue;
        }
        drop(inner);

        replay_level(&weak, depth, node.selector).await;
        let Some(inner) = live(&weak) else {
            return;
        };
        inner.instrument(node.selector, &path);

        for child in node.children.iter().rev() {
            let mut child_path = path.clone();
            child_path.push(child.selector);
            work.push((child, child_path));
        }
    }
    trace!(pass, "detection pass finished");
}

async fn replay_level(weak: &Weak<NavigatorInner>, depth: usize, selector: &'static str) {
    let Some(inner) = live(weak) else {
        return;
    };
    let Some(step) = inner.state.borrow_mut().replay.claim(depth, selector) else {
        return;
    };

    if depth == 0 {
        let channel = Rc::clone(&inner.channel);
        let limit = inner.config.guard_reset_timeout();
        let timeout_ms = inner.config.guard_reset_timeout_ms;
        drop(inner);
        let outcome = tokio::time::timeout(limit, channel.reset_loading_guard())
            .await
            .unwrap_or(Err(NavkeepError::Timeout { ms: timeout_ms }));
        match outcome {
            Ok(()) => debug!("loading guard reset"),
            Err(e) => warn!(error = %e, "loading guard reset failed, replaying anyway"),
        }
    } else {
        drop(inner);
    }

    let Some(inner) = live(weak) else {
        return;
    };
    let candidates = inner.matches(selector);
    match candidates.get(step.index) {
        Some(target) => {
            info!(depth, selector, index = step.index, "replaying activation");
            inner.activate(target);
        }
        None => warn!(
            depth,
            selector,
            index = step.index,
            available = candidates.len(),
            "replay target missing, level skipped"
        ),
    }
    if step.last {
        info!("replay complete");
        inner.begin_scroll_restore();
    }
}

impl NavigatorInner {
    fn matches(&self, selector: &str) -> Vec<Node> {
        match global_query_selector_all(&self.root, selector, QueryMode::Flat) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(selector, error = %e, "descriptor selector rejected");
                Vec::new()
            }
        }
    }

    fn activate(&self, target: &Node) {
        self.activating.set(true);
        target.click();
        self.activating.set(false);
    }

    /// Attach click recorders to matching elements that lack one
    fn instrument(&self, selector: &'static str, path: &[&'static str]) {
        let current = self.matches(selector);
        let fresh: Vec<Node> = {
            let mut state = self.state.borrow_mut();
            let known = state.instrumented.entry(selector).or_default();
            known.retain(Node::is_connected);
            let fresh: Vec<Node> = current
                .into_iter()
                .filter(|node| !known.contains(node))
                .collect();
            known.extend(fresh.iter().cloned());
            fresh
        };
        if fresh.is_empty() {
            return;
        }

        let path: Rc<[&'static str]> = path.into();
        for node in &fresh {
            let weak = self.me.clone();
            let path = Rc::clone(&path);
            let attached = node.add_click_listener(move |clicked| {
                if let Some(inner) = weak.upgrade() {
                    inner.record_click(selector, &path, clicked);
                }
            });
            if let Err(e) = attached {
                warn!(selector, error = %e, "could not attach click recorder");
            }
        }
        debug!(selector, depth = path.len() - 1, added = fresh.len(), "instrumented");
    }

    fn record_click(&self, selector: &'static str, path: &[&'static str], clicked: &Node) {
        if self.torn_down.get() {
            return;
        }
        if self.activating.get() {
            trace!(selector, "programmatic activation not recorded");
            return;
        }
        let Some(index) = self
            .matches(selector)
            .iter()
            .position(|node| node == clicked)
        else {
            warn!(selector, "clicked element no longer matches its selector");
            return;
        };

        {
            let mut state = self.state.borrow_mut();
            if state.replay.abandon() {
                info!("user navigation, remaining replay abandoned");
            }
            state.stack = state.stack.after_click(path, index);
        }
        info!(selector, depth = path.len() - 1, index, "click recorded");
        self.persist();
    }

    fn on_scroll_end(&self, element: &Node) {
        let metrics = element.scroll_metrics();
        if !metrics.overflows() {
            return;
        }
        let key = match global_selector(element) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "scroll on an element without a selector");
                return;
            }
        };
        debug!(selector = %key, top = metrics.scroll_top, "scroll position recorded");
        self.state
            .borrow_mut()
            .scroll
            .record(key, metrics.scroll_top);
        self.persist();
    }

    fn begin_scroll_restore(&self) {
        let (started, entries) = {
            let mut state = self.state.borrow_mut();
            let started = state.scroll.begin_restore();
            (started, state.scroll.positions().len())
        };
        if !started {
            trace!("no scroll positions to restore");
            return;
        }
        info!(entries, "restoring scroll positions");

        let weak = self.me.clone();
        let limit = self.config.scroll_restore_timeout();
        spawn_local(async move {
            tokio::time::sleep(limit).await;
            if let Some(inner) = live(&weak) {
                inner.expire_scroll_restore();
            }
        });
        self.attempt_scroll_restore();
    }

    /// Scroll every pending entry whose element resolves and is tall enough
    fn attempt_scroll_restore(&self) {
        let targets = self.state.borrow().scroll.pending_targets();
        let mut changed = false;

        for (key, top) in targets {
            let element = match self.resolve_scroll_key(&key) {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => {
                    warn!(selector = %key, error = %e, "scroll entry unresolvable, dropped");
                    self.state.borrow_mut().scroll.discard(&key);
                    changed = true;
                    continue;
                }
            };
            if element.scroll_metrics().max_scroll_top() < top {
                continue;
            }
            if self.state.borrow_mut().scroll.claim(&key).is_none() {
                continue;
            }
            changed = true;
            match element.scroll_to(top, ScrollBehavior::Smooth) {
                Ok(applied) => info!(selector = %key, top = applied, "scroll position restored"),
                Err(e) => warn!(selector = %key, error = %e, "scroll restore failed"),
            }
        }

        if changed {
            self.persist();
        }
    }

    fn resolve_scroll_key(&self, key: &str) -> NavkeepResult<Option<Node>> {
        global_query_selector(&self.root, key, QueryMode::FrameQualified)
    }

    fn expire_scroll_restore(&self) {
        let dropped = self.state.borrow_mut().scroll.expire();
        if dropped.is_empty() {
            return;
        }
        for key in &dropped {
            warn!(selector = %key, "scroll restoration timed out, entry dropped");
        }
        self.persist();
    }

    /// Write the full record after every state change
    fn persist(&self) {
        let record = {
            let state = self.state.borrow();
            SessionRecord {
                navigation_stack: state.stack.clone(),
                scroll_positions: state.scroll.positions().clone(),
            }
        };
        if let Err(e) = record.store(self.storage.as_ref(), &self.config.storage_key) {
            warn!(error = %e, "failed to persist session record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DocumentFixture, ElementFixture, ScrollMetrics};
    use crate::navigation::messenger::ChannelMessenger;
    use crate::navigation::session::FileStorage;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::task::LocalSet;

    /// A -> B -> C
    static TREE: &[NavElement] = &[NavElement {
        selector: "a.nav",
        children: &[NavElement {
            selector: "b.tab",
            children: &[NavElement {
                selector: "c.section",
                children: &[],
            }],
        }],
    }];

    const KEY: &str = "navkeep:session";

    type Log = Rc<RefCell<Vec<String>>>;

    fn config() -> NavigatorConfig {
        NavigatorConfig::default().with_settle_delay_ms(100)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }

    /// Three `a.nav` links. Clicking a link renders two `b.tab` tabs into
    /// `#panel`, clicking a tab renders two `c.section` links into
    /// `#sections`. Every click is logged as `<tag><ordinal>`.
    fn portal(log: &Log) -> Document {
        let doc = DocumentFixture::new(vec![
            ElementFixture::new("nav")
                .child(ElementFixture::new("a").attr("class", "nav"))
                .child(ElementFixture::new("a").attr("class", "nav"))
                .child(ElementFixture::new("a").attr("class", "nav")),
            ElementFixture::new("div").attr("id", "panel"),
            ElementFixture::new("div").attr("id", "sections"),
        ])
        .build()
        .unwrap();
        for (i, link) in doc.query_selector_all("a.nav").unwrap().iter().enumerate() {
            let log = Rc::clone(log);
            let doc = doc.clone();
            link.add_click_listener(move |_| {
                log.borrow_mut().push(format!("a{i}"));
                render_children(&doc, "#panel", "b", "tab", Some(Rc::clone(&log)));
            })
            .unwrap();
        }
        doc
    }

    fn render_children(doc: &Document, container: &str, tag: &str, class: &str, log: Option<Log>) {
        let panel = doc.query_selector(container).unwrap().unwrap();
        if !panel.children().is_empty() {
            return;
        }
        for i in 0..2 {
            let element = doc.create_element(tag);
            element.set_attribute("class", class).unwrap();
            if let Some(log) = &log {
                let log = Rc::clone(log);
                let doc = doc.clone();
                let label = format!("{tag}{i}");
                element
                    .add_click_listener(move |_| {
                        log.borrow_mut().push(label.clone());
                        render_children(&doc, "#sections", "c", "section", None);
                    })
                    .unwrap();
            }
            panel.append_child(&element).unwrap();
        }
    }

    fn stored(storage: &MemoryStorage) -> SessionRecord {
        SessionRecord::parse(&storage.get_item(KEY).unwrap().unwrap()).unwrap()
    }

    fn store_stack(storage: &MemoryStorage, entries: Vec<NavEntry>) {
        SessionRecord {
            navigation_stack: NavigationStack::new(entries),
            scroll_positions: BTreeMap::new(),
        }
        .store(storage, KEY)
        .unwrap();
    }

    fn start(doc: &Document, storage: &MemoryStorage) -> Navigator {
        Navigator::builder(doc.clone())
            .descriptor(TREE)
            .config(config())
            .storage(storage.clone())
            .start()
    }

    mod recording_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_scenario_record_then_replay_after_reload() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;

                    doc.query_selector_all("a.nav").unwrap()[2].click();
                    assert_eq!(nav.stack().entries(), &[NavEntry::new("a.nav", 2)]);
                    settle().await;

                    doc.query_selector_all("b.tab").unwrap()[0].click();
                    assert_eq!(
                        nav.stack().entries(),
                        &[NavEntry::new("a.nav", 2), NavEntry::new("b.tab", 0)]
                    );
                    assert_eq!(stored(&storage).navigation_stack, nav.stack());
                    drop(nav);

                    // reload: fresh DOM, same session storage
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    assert!(nav.is_replaying());
                    settle().await;
                    settle().await;

                    assert_eq!(*log.borrow(), vec!["a2", "b0"]);
                    assert!(!nav.is_replaying());
                    assert_eq!(nav.replay_cursor(), 2);
                    assert_eq!(
                        nav.stack().entries(),
                        &[NavEntry::new("a.nav", 2), NavEntry::new("b.tab", 0)]
                    );
                    assert_eq!(doc.query_selector_all("c.section").unwrap().len(), 2);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_repeated_passes_instrument_once() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;

                    // unrelated mutations trigger more passes over an unchanged tree
                    for _ in 0..3 {
                        let body = doc.body().unwrap();
                        body.append_child(&doc.create_element("p")).unwrap();
                        crate::dom::deliver_mutations();
                        settle().await;
                    }

                    assert_eq!(nav.instrumented("a.nav"), 3);
                    let link = doc.query_selector_all("a.nav").unwrap()[1].clone();
                    // one app listener plus one recorder
                    assert_eq!(link.click_listener_count(), 2);
                    link.click();
                    assert_eq!(nav.stack().entries(), &[NavEntry::new("a.nav", 1)]);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_truncates_deeper_levels() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;
                    doc.query_selector_all("a.nav").unwrap()[0].click();
                    settle().await;
                    doc.query_selector_all("b.tab").unwrap()[1].click();
                    settle().await;
                    doc.query_selector_all("c.section").unwrap()[1].click();
                    assert_eq!(nav.stack().len(), 3);

                    doc.query_selector_all("b.tab").unwrap()[0].click();
                    assert_eq!(
                        nav.stack().entries(),
                        &[NavEntry::new("a.nav", 0), NavEntry::new("b.tab", 0)]
                    );
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_deep_click_pads_unvisited_levels() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    // tabs render without any recorded click on a.nav
                    render_children(&doc, "#panel", "b", "tab", Some(Rc::clone(&log)));
                    let nav = start(&doc, &storage);
                    settle().await;

                    doc.query_selector_all("b.tab").unwrap()[1].click();
                    assert_eq!(
                        nav.stack().entries(),
                        &[NavEntry::new("a.nav", 0), NavEntry::new("b.tab", 1)]
                    );
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_children_not_instrumented_without_parent_match() {
            LocalSet::new()
                .run_until(async {
                    let doc = DocumentFixture::new(vec![
                        ElementFixture::new("b").attr("class", "tab")
                    ])
                    .build()
                    .unwrap();
                    let nav = start(&doc, &MemoryStorage::new());
                    settle().await;
                    assert_eq!(nav.instrumented("b.tab"), 0);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_shutdown_stops_recording() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;
                    nav.shutdown();
                    assert!(nav.is_shut_down());
                    assert!(!nav.engine().is_connected());

                    doc.query_selector_all("a.nav").unwrap()[0].click();
                    assert!(nav.stack().is_empty());
                    assert!(storage.get_item(KEY).unwrap().is_none());
                })
                .await;
        }
    }

    mod replay_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_round_trip_persistence() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let entries = vec![NavEntry::new("a.nav", 2), NavEntry::new("b.tab", 0)];
                    store_stack(&storage, entries.clone());
                    let nav = start(&Document::with_body(), &storage);
                    assert_eq!(nav.stack().entries(), entries.as_slice());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_legacy_record_replays() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    storage
                        .set_item(KEY, r#"[{"selector":"a.nav","index":1}]"#)
                        .unwrap();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;
                    assert_eq!(*log.borrow(), vec!["a1"]);
                    assert!(!nav.is_replaying());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_corrupt_record_starts_empty() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    storage.set_item(KEY, "{not json").unwrap();
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    assert!(nav.stack().is_empty());
                    settle().await;
                    assert!(log.borrow().is_empty());

                    doc.query_selector_all("a.nav").unwrap()[0].click();
                    assert_eq!(stored(&storage).navigation_stack.len(), 1);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_stack_outside_descriptor_discarded() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(&storage, vec![NavEntry::new("b.tab", 0)]);
                    let nav = start(&Document::with_body(), &storage);
                    assert!(nav.stack().is_empty());
                    assert!(!nav.is_replaying());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_out_of_range_ordinal_skips_level() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(
                        &storage,
                        vec![NavEntry::new("a.nav", 7), NavEntry::new("b.tab", 0)],
                    );
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);
                    settle().await;

                    assert!(log.borrow().is_empty());
                    assert_eq!(nav.replay_cursor(), 1);
                    assert!(nav.is_replaying());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_user_click_abandons_replay() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(
                        &storage,
                        vec![NavEntry::new("a.nav", 0), NavEntry::new("b.tab", 1)],
                    );
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let nav = start(&doc, &storage);

                    // depth 0 replays at 100ms, depth 1 would follow at 200ms
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    assert_eq!(*log.borrow(), vec!["a0"]);
                    assert!(nav.is_replaying());
                    doc.query_selector_all("a.nav").unwrap()[2].click();
                    assert!(!nav.is_replaying());
                    settle().await;

                    assert_eq!(*log.borrow(), vec!["a0", "a2"]);
                    assert_eq!(nav.replay_cursor(), 1);
                    assert_eq!(nav.stack().entries(), &[NavEntry::new("a.nav", 2)]);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_guard_reset_precedes_first_activation() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(&storage, vec![NavEntry::new("a.nav", 0)]);
                    let log: Log = Rc::default();
                    let doc = portal(&log);

                    let (messenger, mut requests) = ChannelMessenger::pair(1);
                    let privileged_log = Rc::clone(&log);
                    tokio::task::spawn_local(async move {
                        while let Some(request) = requests.recv().await {
                            privileged_log.borrow_mut().push("guard".to_string());
                            request.confirm();
                        }
                    });

                    let _nav = Navigator::builder(doc.clone())
                        .descriptor(TREE)
                        .config(config())
                        .storage(storage.clone())
                        .channel(messenger)
                        .start();
                    settle().await;
                    assert_eq!(*log.borrow(), vec!["guard", "a0"]);
                })
                .await;
        }

        struct SilentChannel;

        #[async_trait(?Send)]
        impl PrivilegedChannel for SilentChannel {
            async fn reset_loading_guard(&self) -> NavkeepResult<()> {
                std::future::pending().await
            }
        }

        struct BrokenChannel;

        #[async_trait(?Send)]
        impl PrivilegedChannel for BrokenChannel {
            async fn reset_loading_guard(&self) -> NavkeepResult<()> {
                Err(NavkeepError::channel("extension context invalidated"))
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_guard_reset_timeout_still_activates() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(&storage, vec![NavEntry::new("a.nav", 1)]);
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let _nav = Navigator::builder(doc.clone())
                        .descriptor(TREE)
                        .config(config().with_guard_reset_timeout_ms(300))
                        .storage(storage.clone())
                        .channel(SilentChannel)
                        .start();
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    assert!(log.borrow().is_empty());
                    settle().await;
                    assert_eq!(*log.borrow(), vec!["a1"]);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_guard_reset_failure_still_activates() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_stack(&storage, vec![NavEntry::new("a.nav", 2)]);
                    let log: Log = Rc::default();
                    let doc = portal(&log);
                    let _nav = Navigator::builder(doc.clone())
                        .descriptor(TREE)
                        .config(config())
                        .storage(storage.clone())
                        .channel(BrokenChannel)
                        .start();
                    settle().await;
                    assert_eq!(*log.borrow(), vec!["a2"]);
                })
                .await;
        }
    }

    mod scroll_tests {
        use super::*;

        const PANE_KEY: &str = "iframe div:nth-of-type(2)";

        /// `a.nav` links plus an iframe whose second div scrolls
        fn framed(pane_height: f64) -> Document {
            DocumentFixture::new(vec![
                ElementFixture::new("a").attr("class", "nav"),
                ElementFixture::new("iframe").document(DocumentFixture::new(vec![
                    ElementFixture::new("div"),
                    ElementFixture {
                        scroll: Some(ScrollMetrics::new(pane_height, 200.0)),
                        ..ElementFixture::new("div")
                    },
                ])),
            ])
            .build()
            .unwrap()
        }

        fn pane(doc: &Document) -> Node {
            doc.iframes()[0]
                .content_document()
                .unwrap()
                .query_selector_all("div")
                .unwrap()[1]
                .clone()
        }

        fn store_scroll(storage: &MemoryStorage, stack: Vec<NavEntry>, top: f64) {
            SessionRecord {
                navigation_stack: NavigationStack::new(stack),
                scroll_positions: BTreeMap::from([(PANE_KEY.to_string(), top)]),
            }
            .store(storage, KEY)
            .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_scroll_end_records_derived_selector() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let doc = framed(1000.0);
                    let nav = start(&doc, &storage);

                    pane(&doc).scroll_to(320.0, ScrollBehavior::Auto).unwrap();
                    assert_eq!(nav.scroll_positions().get(PANE_KEY), Some(&320.0));
                    assert_eq!(stored(&storage).scroll_positions.get(PANE_KEY), Some(&320.0));
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_shutdown_removes_scroll_listeners() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    let doc = framed(1000.0);
                    let frame_doc = doc.iframes()[0].content_document().unwrap();
                    let nav = start(&doc, &storage);
                    assert_eq!(doc.scroll_end_listener_count(), 1);
                    assert_eq!(frame_doc.scroll_end_listener_count(), 1);

                    nav.shutdown();
                    assert_eq!(doc.scroll_end_listener_count(), 0);
                    assert_eq!(frame_doc.scroll_end_listener_count(), 0);

                    pane(&doc).scroll_to(320.0, ScrollBehavior::Auto).unwrap();
                    assert!(nav.scroll_positions().is_empty());
                    assert!(storage.get_item(KEY).unwrap().is_none());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_non_overflowing_scroll_ignored() {
            LocalSet::new()
                .run_until(async {
                    let doc = framed(100.0);
                    let nav = start(&doc, &MemoryStorage::new());
                    pane(&doc).dispatch_scroll_end();
                    assert!(nav.scroll_positions().is_empty());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_restore_immediately_without_replay() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_scroll(&storage, Vec::new(), 450.0);
                    let doc = framed(1000.0);
                    let nav = start(&doc, &storage);

                    assert_eq!(pane(&doc).scroll_top(), 450.0);
                    assert!(!nav.is_restoring_scroll());
                    assert_eq!(nav.scroll_positions().get(PANE_KEY), Some(&450.0));
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_restore_waits_for_replay() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_scroll(&storage, vec![NavEntry::new("a.nav", 0)], 120.0);
                    let doc = framed(1000.0);
                    let nav = start(&doc, &storage);

                    tokio::time::sleep(Duration::from_millis(10)).await;
                    assert_eq!(pane(&doc).scroll_top(), 0.0);
                    settle().await;
                    assert!(!nav.is_replaying());
                    assert_eq!(pane(&doc).scroll_top(), 120.0);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_restore_retried_on_mutation() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_scroll(&storage, Vec::new(), 600.0);
                    let doc = framed(500.0);
                    let nav = start(&doc, &storage);
                    assert!(nav.is_restoring_scroll());
                    assert_eq!(pane(&doc).scroll_top(), 0.0);

                    // content grows, then the frame document mutates
                    let target = pane(&doc);
                    target
                        .set_scroll_metrics(ScrollMetrics::new(2000.0, 200.0))
                        .unwrap();
                    let frame_doc = target.owner_document().clone();
                    target.append_child(&frame_doc.create_element("p")).unwrap();
                    crate::dom::deliver_mutations();

                    assert_eq!(target.scroll_top(), 600.0);
                    assert!(!nav.is_restoring_scroll());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_restore_timeout_drops_entry() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_scroll(&storage, Vec::new(), 900.0);
                    let doc = framed(500.0);
                    let nav = start(&doc, &storage);

                    tokio::time::sleep(Duration::from_millis(5100)).await;
                    assert!(nav.scroll_positions().is_empty());
                    assert!(stored(&storage).scroll_positions.is_empty());
                    assert!(!nav.is_restoring_scroll());

                    // tall enough now, but the entry is gone for good
                    let target = pane(&doc);
                    target
                        .set_scroll_metrics(ScrollMetrics::new(2000.0, 200.0))
                        .unwrap();
                    let frame_doc = target.owner_document().clone();
                    target.append_child(&frame_doc.create_element("p")).unwrap();
                    crate::dom::deliver_mutations();
                    settle().await;
                    assert_eq!(target.scroll_top(), 0.0);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_user_scroll_wins_over_pending_restore() {
            LocalSet::new()
                .run_until(async {
                    let storage = MemoryStorage::new();
                    store_scroll(&storage, Vec::new(), 900.0);
                    let doc = framed(500.0);
                    let nav = start(&doc, &storage);

                    pane(&doc).scroll_to(40.0, ScrollBehavior::Auto).unwrap();
                    assert!(!nav.is_restoring_scroll());
                    tokio::time::sleep(Duration::from_millis(6000)).await;
                    assert_eq!(nav.scroll_positions().get(PANE_KEY), Some(&40.0));
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_file_storage_backend() {
            LocalSet::new()
                .run_until(async {
                    let dir = tempfile::tempdir().unwrap();
                    let storage = FileStorage::new(dir.path().join("session.json"));
                    let doc = framed(1000.0);
                    let _nav = Navigator::builder(doc.clone())
                        .descriptor(TREE)
                        .config(config())
                        .storage(storage.clone())
                        .start();
                    pane(&doc).scroll_to(75.0, ScrollBehavior::Smooth).unwrap();

                    let record = SessionRecord::load(&storage, KEY).unwrap();
                    assert_eq!(record.scroll_positions.get(PANE_KEY), Some(&75.0));
                })
                .await;
        }
    }
}
