//! Selector resolution across nested iframe documents.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dom::{Combinator, ComplexSelector, Document, Node, SelectorList, SelectorPart};
use crate::result::NavkeepResult;

/// How a selector is resolved against the frame tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    /// Union of per-document results over every reachable document
    #[default]
    Flat,
    /// `iframe` segments in the selector descend into frame documents
    FrameQualified,
}

/// Every document reachable from `root` through iframe content documents,
/// in depth-first pre-order, starting with `root`.
///
/// Frames are rediscovered on each call. Unloaded or inaccessible frames
/// contribute nothing.
#[must_use]
pub fn discover_documents(root: &Document) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(doc) = stack.pop() {
        if !seen.insert(doc.id()) {
            continue;
        }
        let frames: Vec<Document> = doc
            .iframes()
            .iter()
            .filter_map(Node::content_document)
            .collect();
        stack.extend(frames.into_iter().rev());
        out.push(doc);
    }
    out
}

/// First element matching `selector` anywhere in the frame tree
pub fn global_query_selector(
    root: &Document,
    selector: &str,
    mode: QueryMode,
) -> NavkeepResult<Option<Node>> {
    Ok(global_query_selector_all(root, selector, mode)?
        .into_iter()
        .next())
}

/// All elements matching `selector` in the frame tree.
///
/// # Errors
///
/// An unparseable selector is an [`InvalidSelector`] error in both modes.
///
/// [`InvalidSelector`]: crate::NavkeepError::InvalidSelector
pub fn global_query_selector_all(
    root: &Document,
    selector: &str,
    mode: QueryMode,
) -> NavkeepResult<Vec<Node>> {
    let list = SelectorList::parse(selector)?;
    let nodes = match mode {
        QueryMode::Flat => discover_documents(root)
            .iter()
            .flat_map(|doc| doc.select(&list))
            .collect(),
        QueryMode::FrameQualified => {
            let mut out: Vec<Node> = Vec::new();
            for group in list.groups() {
                for node in resolve_frame_path(root, group) {
                    if !out.contains(&node) {
                        out.push(node);
                    }
                }
            }
            out
        }
    };
    Ok(nodes)
}

/// One piece of a frame-qualified selector, evaluated inside a single
/// document set
struct FrameSegment {
    selector: ComplexSelector,
    last: bool,
}

/// Split after every `iframe` compound followed by a descendant or child
/// combinator. A child combinator anchors the next segment at the frame
/// document's root element.
fn split_frame_segments(selector: &ComplexSelector) -> Vec<FrameSegment> {
    let parts: &[SelectorPart] = selector.parts();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut anchored = false;

    for idx in 0..parts.len() {
        let Some(next) = parts.get(idx + 1) else {
            break;
        };
        let crosses_frame = parts[idx].compound().tag() == Some("iframe")
            && matches!(
                next.combinator(),
                Some(Combinator::Descendant | Combinator::Child)
            );
        if crosses_frame {
            segments.push(FrameSegment {
                selector: ComplexSelector::from_parts(&parts[start..=idx], anchored),
                last: false,
            });
            anchored = next.combinator() == Some(Combinator::Child);
            start = idx + 1;
        }
    }
    segments.push(FrameSegment {
        selector: ComplexSelector::from_parts(&parts[start..], anchored),
        last: true,
    });
    segments
}

fn resolve_frame_path(root: &Document, selector: &ComplexSelector) -> Vec<Node> {
    let mut documents = vec![root.clone()];

    for segment in split_frame_segments(selector) {
        let matched: Vec<Node> = documents
            .iter()
            .flat_map(|doc| doc.select_complex(&segment.selector))
            .collect();
        if segment.last {
            return matched;
        }

        let mut next: Vec<Document> = Vec::new();
        for frame in matched {
            if let Some(doc) = frame.content_document() {
                if !next.contains(&doc) {
                    next.push(doc);
                }
            }
        }
        if next.is_empty() {
            return Vec::new();
        }
        documents = next;
    }
    Vec::new()
}
