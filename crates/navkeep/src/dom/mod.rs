//! In-memory host document model.
//!
//! Documents, element handles, iframe embedding, scroll geometry, click and
//! scroll-settle listeners, mutation observers and the selector engine used
//! by every query in the crate.

mod document;
mod fixture;
mod mutation;
pub mod selector;

pub use document::{
    Document, DocumentId, ListenerId, Node, NodeId, ScrollBehavior, ScrollMetrics,
};
pub use fixture::{DocumentFixture, ElementFixture};
pub use mutation::{
    deliver_mutations, MutationKind, MutationObserver, MutationObserverInit, MutationRecord,
};
pub use selector::{Combinator, ComplexSelector, CompoundSelector, SelectorList, SelectorPart};
