//! Compiled-in description of the portal's navigable regions.

use std::fmt::Write as _;

/// One navigable region: a selector for its clickable elements and the
/// regions that only become relevant once one of them is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavElement {
    /// Flat-mode selector for the clickable elements at this level
    pub selector: &'static str,
    /// Regions revealed by activating an element of this level
    pub children: &'static [NavElement],
}

/// Navigation hierarchy of the student portal: top navbar, enrollment
/// tabs, cart panel tabs, then section links inside the cart panel frame.
pub static PORTAL_NAVIGATION: &[NavElement] = &[NavElement {
    selector: "nav.portal-navbar a.nav-link",
    children: &[NavElement {
        selector: "ul.enrollment-tabs > li > a",
        children: &[NavElement {
            selector: "div.cart-panel [role=tab]",
            children: &[NavElement {
                selector: "table.section-list a.section-link",
                children: &[],
            }],
        }],
    }],
}];

/// Selector path from the top level down to a node matching `path`
/// selectors level by level; `None` when the path leaves the tree
#[must_use]
pub fn resolve_path<S: AsRef<str>>(
    tree: &'static [NavElement],
    path: &[S],
) -> Option<Vec<&'static NavElement>> {
    let mut level = tree;
    let mut out = Vec::with_capacity(path.len());
    for selector in path {
        let node = level.iter().find(|n| n.selector == selector.as_ref())?;
        out.push(node);
        level = node.children;
    }
    Some(out)
}

/// Indented text rendering of a descriptor tree
#[must_use]
pub fn render_tree(tree: &'static [NavElement]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&NavElement, usize)> = tree.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let _ = writeln!(out, "{}{} {}", "  ".repeat(depth), depth, node.selector);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}
