//! Command handlers.
//!
//! Each handler loads its inputs, runs the library operation and returns
//! data; rendering happens in [`crate::output`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use navkeep::navigation::{render_tree, FileStorage, SessionStorage};
use navkeep::{
    global_query_selector, global_query_selector_all, global_selector, Document,
    DocumentFixture, Node, QueryMode, SessionRecord, PORTAL_NAVIGATION,
};

use crate::error::{CliError, CliResult};

/// One query match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    /// Owning document
    pub document: String,
    /// Short element description
    pub element: String,
    /// Derived frame-qualified selector
    pub selector: String,
}

impl MatchRow {
    fn from_node(node: &Node) -> CliResult<Self> {
        Ok(Self {
            document: node.owner_document().id().to_string(),
            element: node.describe(),
            selector: global_selector(node)?,
        })
    }
}

/// Read the session record stored under `key` in a storage file
pub fn inspect(path: &Path, key: &str) -> CliResult<SessionRecord> {
    let storage = FileStorage::new(path);
    let raw = storage
        .get_item(key)?
        .ok_or_else(|| CliError::RecordNotFound {
            key: key.to_string(),
            path: path.display().to_string(),
        })?;
    debug!(key, bytes = raw.len(), "session record read");
    Ok(SessionRecord::parse(&raw)?)
}

/// Load a page fixture into a live document tree
pub fn load_fixture(path: &Path) -> CliResult<Document> {
    let document = DocumentFixture::from_path(path)?.build()?;
    info!(path = %path.display(), root = %document.id(), "fixture loaded");
    Ok(document)
}

/// Resolve `selector` over the fixture's frame tree
pub fn query(path: &Path, selector: &str, frames: bool) -> CliResult<Vec<MatchRow>> {
    let root = load_fixture(path)?;
    let mode = if frames {
        QueryMode::FrameQualified
    } else {
        QueryMode::Flat
    };
    global_query_selector_all(&root, selector, mode)?
        .iter()
        .map(MatchRow::from_node)
        .collect()
}

/// Derived global selector of the first flat-mode match
pub fn selector(path: &Path, selector: &str) -> CliResult<String> {
    let root = load_fixture(path)?;
    let node = global_query_selector(&root, selector, QueryMode::Flat)?
        .ok_or_else(|| CliError::no_match(selector))?;
    Ok(global_selector(&node)?)
}

/// The compiled-in descriptor tree
#[must_use]
pub fn descriptor() -> String {
    render_tree(PORTAL_NAVIGATION)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"
body:
  - tag: nav
    attrs: { class: portal-navbar }
    children:
      - { tag: a, attrs: { class: nav-link } }
      - { tag: a, attrs: { class: nav-link } }
  - tag: iframe
    document:
      body:
        - tag: ul
          children:
            - { tag: li }
            - { tag: li, attrs: { class: active } }
"#;

    fn fixture(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("page.yaml");
        fs::write(&path, FIXTURE).unwrap();
        path
    }

    mod inspect_tests {
        use super::*;

        #[test]
        fn test_composite_and_legacy() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("session.json");
            let storage = FileStorage::new(&path);
            storage
                .set_item(
                    "navkeep:session",
                    r#"{"navigationStack":[{"selector":"a","index":1}],"scrollPositions":{}}"#,
                )
                .unwrap();
            storage
                .set_item("old", r#"[{"selector":"a","index":3}]"#)
                .unwrap();

            let record = inspect(&path, "navkeep:session").unwrap();
            assert_eq!(record.navigation_stack.len(), 1);
            let legacy = inspect(&path, "old").unwrap();
            assert_eq!(legacy.navigation_stack.entries()[0].index, 3);
        }

        #[test]
        fn test_missing_key() {
            let dir = TempDir::new().unwrap();
            let err = inspect(&dir.path().join("absent.json"), "navkeep:session").unwrap_err();
            assert!(matches!(err, CliError::RecordNotFound { .. }));
        }

        #[test]
        fn test_corrupt_record_is_an_error_here() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("session.json");
            FileStorage::new(&path).set_item("k", "{oops").unwrap();
            assert!(matches!(
                inspect(&path, "k"),
                Err(CliError::Navkeep(navkeep::NavkeepError::SessionRecord { .. }))
            ));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_flat_and_frame_qualified() {
            let dir = TempDir::new().unwrap();
            let path = fixture(&dir);

            let flat = query(&path, "li", false).unwrap();
            assert_eq!(flat.len(), 2);
            assert_eq!(flat[1].element, "li.active");
            assert_eq!(flat[1].selector, "iframe li:nth-of-type(2)");

            // flat mode never crosses a frame boundary inside one selector
            assert!(query(&path, "iframe li", false).unwrap().is_empty());
            assert_eq!(query(&path, "iframe li", true).unwrap().len(), 2);
        }

        #[test]
        fn test_invalid_selector() {
            let dir = TempDir::new().unwrap();
            let path = fixture(&dir);
            assert!(matches!(
                query(&path, "li >", false),
                Err(CliError::Navkeep(navkeep::NavkeepError::InvalidSelector { .. }))
            ));
        }

        #[test]
        fn test_selector_first_match() {
            let dir = TempDir::new().unwrap();
            let path = fixture(&dir);
            assert_eq!(selector(&path, "a.nav-link").unwrap(), "a:nth-of-type(1)");
            assert!(matches!(
                selector(&path, "table"),
                Err(CliError::NoMatch { .. })
            ));
        }
    }

    #[test]
    fn test_descriptor_lists_portal_levels() {
        let tree = descriptor();
        assert!(tree.starts_with("0 nav.portal-navbar a.nav-link\n"));
        assert!(tree.contains("table.section-list a.section-link"));
    }
}
