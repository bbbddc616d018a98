//! Serializable page fixtures.
//!
//! A fixture describes a document's `<body>` content, including the
//! documents embedded by `<iframe>` elements, so frame trees can be loaded
//! from JSON or YAML files.
//!
//! ```yaml
//! body:
//!   - tag: nav
//!     attrs: { class: top }
//!     children:
//!       - { tag: a, text: Home }
//!   - tag: iframe
//!     document:
//!       body:
//!         - tag: div
//!           scroll: { scrollHeight: 900, clientHeight: 300 }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::document::{Document, Node, ScrollMetrics};
use crate::result::{NavkeepError, NavkeepResult};

/// Content of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFixture {
    /// Children of `<body>`
    #[serde(default)]
    pub body: Vec<ElementFixture>,
}

/// One element and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementFixture {
    /// Tag name
    pub tag: String,
    /// Attributes, applied in key order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Text appended before the element children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Scroll geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollMetrics>,
    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementFixture>,
    /// Embedded document; only valid on `iframe`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Box<DocumentFixture>>,
}

impl ElementFixture {
    /// Bare element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            text: None,
            scroll: None,
            children: Vec::new(),
            document: None,
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Add a child element
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Set the embedded document
    #[must_use]
    pub fn document(mut self, document: DocumentFixture) -> Self {
        self.document = Some(Box::new(document));
        self
    }
}

impl DocumentFixture {
    /// Fixture with the given body children
    #[must_use]
    pub const fn new(body: Vec<ElementFixture>) -> Self {
        Self { body }
    }

    /// Parse a JSON fixture
    pub fn from_json(json: &str) -> NavkeepResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a YAML fixture
    pub fn from_yaml(yaml: &str) -> NavkeepResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a fixture file; `.json` files are JSON, anything else YAML
    pub fn from_path(path: &Path) -> NavkeepResult<Self> {
        let raw = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_yaml(&raw)
        }
    }

    /// Build a live document tree from this fixture
    pub fn build(&self) -> NavkeepResult<Document> {
        Document::from_fixture(self)
    }
}

impl Document {
    /// Build a live document (with nested frame documents) from a fixture.
    ///
    /// Nesting depth is unbounded, so the tree is built from a worklist
    /// rather than recursively.
    ///
    /// # Errors
    ///
    /// [`NavkeepError::Fixture`] for empty tags or a `document` on a
    /// non-iframe element.
    pub fn from_fixture(fixture: &DocumentFixture) -> NavkeepResult<Self> {
        let root = Self::with_body();
        let mut work: Vec<(Node, &ElementFixture)> = Vec::new();
        push_children(&mut work, &root, &fixture.body)?;

        while let Some((parent, item)) = work.pop() {
            let tag = item.tag.trim();
            if tag.is_empty() {
                return Err(NavkeepError::fixture("element with an empty tag"));
            }
            let doc = parent.owner_document().clone();
            let element = doc.create_element(tag);
            for (name, value) in &item.attrs {
                element.set_attribute(name, value)?;
            }
            if let Some(scroll) = item.scroll {
                element.set_scroll_metrics(scroll)?;
            }
            if let Some(text) = &item.text {
                element.append_child(&doc.create_text_node(text))?;
            }
            parent.append_child(&element)?;

            if let Some(nested) = &item.document {
                if !tag.eq_ignore_ascii_case("iframe") {
                    return Err(NavkeepError::fixture(format!(
                        "`{tag}` cannot embed a document"
                    )));
                }
                let inner = Self::with_body();
                element.set_content_document(Some(inner.clone()))?;
                push_children(&mut work, &inner, &nested.body)?;
            }

            for child in item.children.iter().rev() {
                work.push((element.clone(), child));
            }
        }
        Ok(root)
    }
}

fn push_children<'a>(
    work: &mut Vec<(Node, &'a ElementFixture)>,
    document: &Document,
    children: &'a [ElementFixture],
) -> NavkeepResult<()> {
    let body = document
        .body()
        .ok_or_else(|| NavkeepError::fixture("document has no body"))?;
    for child in children.iter().rev() {
        work.push((body.clone(), child));
    }
    Ok(())
}
