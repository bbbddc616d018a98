//! The navigation stack: which element was activated at each visited level.

use serde::{Deserialize, Serialize};

/// One visited level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    /// Descriptor selector of this level
    pub selector: String,
    /// Ordinal of the activated element among the selector's matches
    pub index: usize,
}

impl NavEntry {
    /// Create an entry
    #[must_use]
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

/// Ordered entries, one per descriptor depth actually visited.
///
/// The stack is only ever replaced as a whole; see [`after_click`].
///
/// [`after_click`]: NavigationStack::after_click
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationStack {
    entries: Vec<NavEntry>,
}

impl NavigationStack {
    /// Stack from entries
    #[must_use]
    pub const fn new(entries: Vec<NavEntry>) -> Self {
        Self { entries }
    }

    /// Entries from depth 0 upward
    #[must_use]
    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    /// Number of levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No levels recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `depth`
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&NavEntry> {
        self.entries.get(depth)
    }

    /// Stack after a click on the `index`-th match of the last selector in
    /// `path`, where `path` holds the descriptor selectors from depth 0 to
    /// the clicked depth.
    ///
    /// Entries above the clicked depth are kept when they belong to the same
    /// path and filled with `{selector, 0}` otherwise; deeper entries are
    /// dropped. An empty `path` yields an empty stack.
    #[must_use]
    pub fn after_click<S: AsRef<str>>(&self, path: &[S], index: usize) -> Self {
        let Some((clicked, ancestors)) = path.split_last() else {
            return Self::default();
        };
        let mut entries: Vec<NavEntry> = ancestors
            .iter()
            .enumerate()
            .map(|(depth, selector)| match self.entries.get(depth) {
                Some(entry) if entry.selector == selector.as_ref() => entry.clone(),
                _ => NavEntry::new(selector.as_ref(), 0),
            })
            .collect();
        entries.push(NavEntry::new(clicked.as_ref(), index));
        Self { entries }
    }
}
