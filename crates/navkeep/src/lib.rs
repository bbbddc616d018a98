//! Navkeep: navigation-position restore for iframe-heavy portals
//!
//! Legacy portals nest their pages in iframes, so a reload drops the user
//! back on the landing view. Navkeep observes the whole frame tree as one
//! document, records which tab, panel and link the user activated, and
//! replays that path (plus scroll offsets) after the reload.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    NAVKEEP Architecture                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌──────────────┐    ┌──────────────┐     │
//! │   │ dom        │    │ frames       │    │ navigation   │     │
//! │   │ documents, │───►│ cross-frame  │───►│ record,      │     │
//! │   │ observers  │    │ query/observe│    │ replay,scroll│     │
//! │   └────────────┘    └──────────────┘    └──────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use navkeep::{global_query_selector, Document, QueryMode};
//!
//! let root = Document::with_body();
//! let body = root.body().unwrap();
//! let frame = root.create_element("iframe");
//! body.append_child(&frame).unwrap();
//!
//! let inner = Document::with_body();
//! let item = inner.create_element("li");
//! inner.body().unwrap().append_child(&item).unwrap();
//! frame.set_content_document(Some(inner)).unwrap();
//!
//! let found = global_query_selector(&root, "iframe li", QueryMode::FrameQualified).unwrap();
//! assert_eq!(found, Some(item));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp))]

pub mod dom;
pub mod frames;
pub mod navigation;
mod result;

pub use dom::{
    deliver_mutations, Document, DocumentFixture, ElementFixture, MutationObserver,
    MutationObserverInit, MutationRecord, Node, ScrollBehavior, ScrollMetrics,
};
pub use frames::{
    discover_documents, global_query_selector, global_query_selector_all, global_selector,
    CrossFrameObserver, QueryMode,
};
pub use navigation::{
    NavElement, NavEntry, NavigationStack, Navigator, NavigatorBuilder, NavigatorConfig,
    SessionRecord, SessionStorage, PORTAL_NAVIGATION,
};
pub use result::{NavkeepError, NavkeepResult};
