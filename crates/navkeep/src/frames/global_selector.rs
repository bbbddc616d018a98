//! Structural selector derivation.
//!
//! Element identities do not survive a reload but tag paths usually do, so
//! scroll positions are keyed by a selector derived from the element's
//! position in the tree. The result is meant for
//! [`QueryMode::FrameQualified`](super::QueryMode::FrameQualified)
//! resolution: every enclosing frame contributes its own path, joined by a
//! space.

use crate::dom::Node;
use crate::result::{NavkeepError, NavkeepResult};

/// Derive a selector that resolves back to `element`.
///
/// Walks upward emitting `tag` (plus `:nth-of-type(k)` when siblings share
/// the tag) and stops as soon as the path is unique within the element's
/// document. Frame documents are prefixed with the path of their `<iframe>`.
///
/// # Errors
///
/// [`NavkeepError::NotAnElement`] if `element` is not an element.
pub fn global_selector(element: &Node) -> NavkeepResult<String> {
    let mut frames = Vec::new();
    let mut cursor = Some(element.clone());

    while let Some(current) = cursor {
        frames.push(local_selector(&current)?);
        cursor = current.owner_document().frame_element();
    }
    frames.reverse();
    Ok(frames.join(" "))
}

fn local_selector(element: &Node) -> NavkeepResult<String> {
    if !element.is_element() {
        return Err(NavkeepError::NotAnElement {
            message: format!("cannot derive a selector for {}", element.describe()),
        });
    }

    let document = element.owner_document();
    let mut segments: Vec<String> = Vec::new();
    let mut cursor = Some(element.clone());

    while let Some(current) = cursor {
        segments.push(segment(&current));
        let path = segments
            .iter()
            .rev()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" > ");
        let resolved = document.query_selector_all(&path)?;
        if resolved.len() == 1 && resolved[0] == *element {
            return Ok(path);
        }
        cursor = current.parent_element();
    }

    segments.reverse();
    Ok(segments.join(" > "))
}

fn segment(element: &Node) -> String {
    let tag = element.tag_name().unwrap_or_default();
    let Some(parent) = element.parent() else {
        return tag;
    };

    let same_tag: Vec<Node> = parent
        .children()
        .into_iter()
        .filter(|sibling| sibling.tag_name().as_deref() == Some(tag.as_str()))
        .collect();
    if same_tag.len() < 2 {
        return tag;
    }
    let position = same_tag
        .iter()
        .position(|sibling| sibling == element)
        .map_or(1, |idx| idx + 1);
    format!("{tag}:nth-of-type({position})")
}
