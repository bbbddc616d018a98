//! Cross-frame observation engine.
//!
//! Treats a root document and every iframe document reachable from it as a
//! single flat document for mutation observation and selector queries, and
//! derives frame-qualified selectors that survive a reload.

mod global_selector;
mod observer;
mod query;

pub use global_selector::global_selector;
pub use observer::CrossFrameObserver;
pub use query::{discover_documents, global_query_selector, global_query_selector_all, QueryMode};
