//! CSS selector parsing and matching.
//!
//! Supports the subset of Selectors Level 4 needed to address portal UI
//! regions and to re-resolve derived structural paths:
//!
//! - type, universal, `#id`, `.class` and attribute selectors
//! - structural pseudo-classes (`:nth-of-type()`, `:nth-child()`, `:root`, ...)
//! - `:not()` with a nested selector list
//! - descendant, `>`, `+` and `~` combinators, and `,` lists
//!
//! Parsing is strict: anything outside the subset is an
//! [`NavkeepError::InvalidSelector`], never a silent empty match.

use super::document::{self, NodeData, NodeId, NodeKind};
use crate::result::{NavkeepError, NavkeepResult};

/// Relation between a compound selector and the one to its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor
    Descendant,
    /// `>`: the parent
    Child,
    /// `+`: the immediately preceding element sibling
    NextSibling,
    /// `~`: any preceding element sibling
    SubsequentSibling,
}

/// `An+B` expression used by the `:nth-*` pseudo-classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    a: i64,
    b: i64,
}

impl Nth {
    /// Create an `An+B` expression
    #[must_use]
    pub const fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    /// Whether a 1-based position satisfies the expression
    #[must_use]
    pub fn matches(self, position: usize) -> bool {
        // i128 holds every i64 difference, so extreme coefficients cannot overflow
        let Ok(position) = i128::try_from(position) else {
            return false;
        };
        let (a, b) = (i128::from(self.a), i128::from(self.b));
        if a == 0 {
            return position == b;
        }
        let diff = position - b;
        diff % a == 0 && diff / a >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
    Word(String),
    DashPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    matcher: AttrMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Vec<ComplexSelector>),
}

/// A sequence of simple selectors with no combinator, e.g. `a.tab[href]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<PseudoClass>,
}

impl CompoundSelector {
    /// Lowercased type selector, if any
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Whether the compound starts with `*`
    #[must_use]
    pub const fn is_universal(&self) -> bool {
        self.universal
    }

    fn anchor_to_root(&mut self) {
        if !self.pseudos.contains(&PseudoClass::Root) {
            self.pseudos.push(PseudoClass::Root);
        }
    }

    fn matches(&self, nodes: &[NodeData], id: NodeId) -> bool {
        let Some(element) = nodes[id.index()].element() else {
            return false;
        };

        if self.tag.as_ref().is_some_and(|tag| *tag != element.tag_name) {
            return false;
        }
        if let Some(wanted) = &self.id {
            if element.attr("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        let attrs_match = self.attrs.iter().all(|attr| {
            let Some(value) = element.attr(&attr.name) else {
                return false;
            };
            match &attr.matcher {
                AttrMatch::Exists => true,
                AttrMatch::Equals(expected) => value == expected,
                AttrMatch::Prefix(expected) => !expected.is_empty() && value.starts_with(expected),
                AttrMatch::Suffix(expected) => !expected.is_empty() && value.ends_with(expected),
                AttrMatch::Substring(expected) => !expected.is_empty() && value.contains(expected),
                AttrMatch::Word(expected) => value.split_whitespace().any(|w| w == expected),
                AttrMatch::DashPrefix(expected) => {
                    value == expected
                        || value
                            .strip_prefix(expected.as_str())
                            .is_some_and(|rest| rest.starts_with('-'))
                }
            }
        });
        if !attrs_match {
            return false;
        }

        self.pseudos
            .iter()
            .all(|pseudo| matches_pseudo(pseudo, nodes, id))
    }
}

/// One compound selector plus the combinator linking it to its left neighbour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPart {
    compound: CompoundSelector,
    combinator: Option<Combinator>,
}

impl SelectorPart {
    /// The compound selector
    #[must_use]
    pub const fn compound(&self) -> &CompoundSelector {
        &self.compound
    }

    /// Relation to the previous part (`None` for the leftmost part)
    #[must_use]
    pub const fn combinator(&self) -> Option<Combinator> {
        self.combinator
    }
}

/// A chain of compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    parts: Vec<SelectorPart>,
}

impl ComplexSelector {
    /// Parts from left to right
    #[must_use]
    pub fn parts(&self) -> &[SelectorPart] {
        &self.parts
    }

    /// Build a selector from a slice of another selector's parts.
    ///
    /// The leftmost part loses its combinator; with `anchored` it must also
    /// match the root element of its document.
    pub(crate) fn from_parts(parts: &[SelectorPart], anchored: bool) -> Self {
        let mut parts = parts.to_vec();
        if let Some(first) = parts.first_mut() {
            first.combinator = None;
            if anchored {
                first.compound.anchor_to_root();
            }
        }
        Self { parts }
    }

    pub(crate) fn matches(&self, nodes: &[NodeData], id: NodeId) -> bool {
        if self.parts.is_empty() {
            return false;
        }
        matches_from(&self.parts, self.parts.len() - 1, nodes, id)
    }
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    groups: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`NavkeepError::InvalidSelector`] for empty input or any
    /// syntax outside the supported subset.
    pub fn parse(source: &str) -> NavkeepResult<Self> {
        let mut parser = Parser::new(source);
        parser.skip_whitespace();
        if parser.at_end() {
            return Err(NavkeepError::invalid_selector(source, "empty selector"));
        }
        let groups = parser.parse_list(false)?;
        Ok(Self {
            source: source.to_string(),
            groups,
        })
    }

    /// The selector text this list was parsed from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The comma-separated alternatives
    #[must_use]
    pub fn groups(&self) -> &[ComplexSelector] {
        &self.groups
    }

    pub(crate) fn matches(&self, nodes: &[NodeData], id: NodeId) -> bool {
        self.groups.iter().any(|group| group.matches(nodes, id))
    }
}

fn matches_from(parts: &[SelectorPart], idx: usize, nodes: &[NodeData], id: NodeId) -> bool {
    if !parts[idx].compound.matches(nodes, id) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    match parts[idx].combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => document::parent_element(nodes, id)
            .is_some_and(|parent| matches_from(parts, idx - 1, nodes, parent)),
        Combinator::Descendant => {
            let mut cursor = document::parent_element(nodes, id);
            while let Some(ancestor) = cursor {
                if matches_from(parts, idx - 1, nodes, ancestor) {
                    return true;
                }
                cursor = document::parent_element(nodes, ancestor);
            }
            false
        }
        Combinator::NextSibling => document::previous_element_sibling(nodes, id)
            .is_some_and(|sibling| matches_from(parts, idx - 1, nodes, sibling)),
        Combinator::SubsequentSibling => {
            let mut cursor = document::previous_element_sibling(nodes, id);
            while let Some(sibling) = cursor {
                if matches_from(parts, idx - 1, nodes, sibling) {
                    return true;
                }
                cursor = document::previous_element_sibling(nodes, sibling);
            }
            false
        }
    }
}

fn matches_pseudo(pseudo: &PseudoClass, nodes: &[NodeData], id: NodeId) -> bool {
    match pseudo {
        PseudoClass::Root => nodes[id.index()]
            .parent
            .is_some_and(|parent| matches!(nodes[parent.index()].kind, NodeKind::Document)),
        PseudoClass::Empty => nodes[id.index()].children.is_empty(),
        PseudoClass::FirstChild => position(nodes, id, false, false) == 1,
        PseudoClass::LastChild => position(nodes, id, false, true) == 1,
        PseudoClass::OnlyChild => {
            position(nodes, id, false, false) == 1 && position(nodes, id, false, true) == 1
        }
        PseudoClass::FirstOfType => position(nodes, id, true, false) == 1,
        PseudoClass::LastOfType => position(nodes, id, true, true) == 1,
        PseudoClass::OnlyOfType => {
            position(nodes, id, true, false) == 1 && position(nodes, id, true, true) == 1
        }
        PseudoClass::NthChild(nth) => nth.matches(position(nodes, id, false, false)),
        PseudoClass::NthLastChild(nth) => nth.matches(position(nodes, id, false, true)),
        PseudoClass::NthOfType(nth) => nth.matches(position(nodes, id, true, false)),
        PseudoClass::NthLastOfType(nth) => nth.matches(position(nodes, id, true, true)),
        PseudoClass::Not(inner) => !inner.iter().any(|group| group.matches(nodes, id)),
    }
}

/// 1-based position of `id` among its element siblings
fn position(nodes: &[NodeData], id: NodeId, same_type: bool, from_end: bool) -> usize {
    let siblings = document::sibling_elements(nodes, id);
    let tag = nodes[id.index()].element().map(|e| e.tag_name.as_str());
    let mut candidates = siblings.iter().filter(|sibling| {
        !same_type || nodes[sibling.index()].element().map(|e| e.tag_name.as_str()) == tag
    });

    let found = if from_end {
        candidates.rev().position(|sibling| *sibling == id)
    } else {
        candidates.position(|sibling| *sibling == id)
    };
    found.map_or(0, |idx| idx + 1)
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> NavkeepError {
        NavkeepError::invalid_selector(
            self.source,
            format!("{} at offset {}", reason.into(), self.pos),
        )
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> NavkeepResult<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", byte as char)))
        }
    }

    /// Returns whether any whitespace was consumed
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self, nested: bool) -> NavkeepResult<Vec<ComplexSelector>> {
        let mut groups = Vec::new();
        loop {
            self.skip_whitespace();
            groups.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') if nested => return Ok(groups),
                None if !nested => return Ok(groups),
                None => return Err(self.error("unclosed `(`")),
                Some(other) => return Err(self.error(format!("unexpected `{}`", other as char))),
            }
        }
    }

    fn parse_complex(&mut self) -> NavkeepResult<ComplexSelector> {
        let mut parts = vec![SelectorPart {
            compound: self.parse_compound()?,
            combinator: None,
        }];

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                Some(b'>') => Combinator::Child,
                Some(b'+') => Combinator::NextSibling,
                Some(b'~') => Combinator::SubsequentSibling,
                None | Some(b',' | b')') => break,
                Some(_) if had_space => Combinator::Descendant,
                Some(other) => {
                    return Err(self.error(format!("unexpected `{}`", other as char)));
                }
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            parts.push(SelectorPart {
                compound: self.parse_compound()?,
                combinator: Some(combinator),
            });
        }

        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> NavkeepResult<CompoundSelector> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();

        if self.eat(b'*') {
            compound.universal = true;
        } else if let Some(tag) = self.parse_ident() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some(b'#') => {
                    self.pos += 1;
                    let id = self
                        .parse_ident()
                        .ok_or_else(|| self.error("expected identifier after `#`"))?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.error("more than one id in compound selector"));
                    }
                }
                Some(b'.') => {
                    self.pos += 1;
                    let class = self
                        .parse_ident()
                        .ok_or_else(|| self.error("expected class name after `.`"))?;
                    compound.classes.push(class);
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(b':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Option<String> {
        let start = self.pos;
        let first = self.peek()?;
        if !(first.is_ascii_alphabetic() || first == b'-' || first == b'_' || first >= 0x80) {
            return None;
        }
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        self.source.get(start..self.pos).map(str::to_string)
    }

    fn parse_attr(&mut self) -> NavkeepResult<AttrSelector> {
        self.skip_whitespace();
        let name = self
            .parse_ident()
            .ok_or_else(|| self.error("expected attribute name"))?
            .to_ascii_lowercase();
        self.skip_whitespace();

        if self.eat(b']') {
            return Ok(AttrSelector {
                name,
                matcher: AttrMatch::Exists,
            });
        }

        let operator = match self.peek() {
            Some(b'=') => None,
            Some(op @ (b'^' | b'$' | b'*' | b'~' | b'|')) => {
                self.pos += 1;
                Some(op)
            }
            _ => return Err(self.error("expected attribute operator")),
        };
        self.expect(b'=')?;
        self.skip_whitespace();
        let value = self.parse_attr_value()?;
        self.skip_whitespace();
        self.expect(b']')?;

        let matcher = match operator {
            None => AttrMatch::Equals(value),
            Some(b'^') => AttrMatch::Prefix(value),
            Some(b'$') => AttrMatch::Suffix(value),
            Some(b'*') => AttrMatch::Substring(value),
            Some(b'~') => AttrMatch::Word(value),
            Some(_) => AttrMatch::DashPrefix(value),
        };
        Ok(AttrSelector { name, matcher })
    }

    fn parse_attr_value(&mut self) -> NavkeepResult<String> {
        let Some(quote @ (b'"' | b'\'')) = self.peek() else {
            return self
                .parse_ident()
                .ok_or_else(|| self.error("expected attribute value"));
        };
        self.pos += 1;

        let mut value = String::new();
        let mut segment_start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                value.push_str(self.slice(segment_start, self.pos)?);
                self.pos += 1;
                let escaped_start = self.pos;
                if self.at_end() {
                    break;
                }
                self.pos += utf8_width(self.bytes[escaped_start]);
                value.push_str(self.slice(escaped_start, self.pos)?);
                segment_start = self.pos;
                continue;
            }
            if byte == quote {
                value.push_str(self.slice(segment_start, self.pos)?);
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }

    fn slice(&self, start: usize, end: usize) -> NavkeepResult<&'a str> {
        self.source
            .get(start..end)
            .ok_or_else(|| self.error("invalid UTF-8 boundary"))
    }

    fn parse_pseudo(&mut self) -> NavkeepResult<PseudoClass> {
        if self.peek() == Some(b':') {
            return Err(self.error("pseudo-elements are not supported"));
        }
        let name = self
            .parse_ident()
            .ok_or_else(|| self.error("expected pseudo-class name"))?
            .to_ascii_lowercase();

        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "nth-child" => PseudoClass::NthChild(self.parse_nth_argument()?),
            "nth-last-child" => PseudoClass::NthLastChild(self.parse_nth_argument()?),
            "nth-of-type" => PseudoClass::NthOfType(self.parse_nth_argument()?),
            "nth-last-of-type" => PseudoClass::NthLastOfType(self.parse_nth_argument()?),
            "not" => {
                self.expect(b'(')?;
                let inner = self.parse_list(true)?;
                self.expect(b')')?;
                PseudoClass::Not(inner)
            }
            other => return Err(self.error(format!("unsupported pseudo-class `:{other}`"))),
        };
        Ok(pseudo)
    }

    fn parse_nth_argument(&mut self) -> NavkeepResult<Nth> {
        self.expect(b'(')?;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b')') {
            self.pos += 1;
        }
        let raw = self.slice(start, self.pos)?;
        self.expect(b')')?;
        parse_nth(raw).ok_or_else(|| self.error(format!("invalid An+B expression `{raw}`")))
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

fn utf8_width(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

fn parse_nth(raw: &str) -> Option<Nth> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.as_str() {
        "odd" => return Some(Nth::new(2, 1)),
        "even" => return Some(Nth::new(2, 0)),
        "" => return None,
        _ => {}
    }

    let Some((a_part, b_part)) = compact.split_once('n') else {
        return compact.parse::<i64>().ok().map(|b| Nth::new(0, b));
    };
    let a = match a_part {
        "" | "+" => 1,
        "-" => -1,
        other => other.parse::<i64>().ok()?,
    };
    let b = if b_part.is_empty() {
        0
    } else {
        if !b_part.starts_with(['+', '-']) {
            return None;
        }
        b_part.parse::<i64>().ok()?
    };
    Some(Nth::new(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_compound_parts() {
            let list = SelectorList::parse("a.tab.active[href^='/cart']:first-of-type").unwrap();
            assert_eq!(list.groups().len(), 1);
            let parts = list.groups()[0].parts();
            assert_eq!(parts.len(), 1);
            assert_eq!(parts[0].compound().tag(), Some("a"));
            assert_eq!(parts[0].compound().classes, vec!["tab", "active"]);
        }

        #[test]
        fn test_parse_combinators() {
            let list = SelectorList::parse("nav > ul li+li ~ li").unwrap();
            let combinators: Vec<_> = list.groups()[0]
                .parts()
                .iter()
                .map(SelectorPart::combinator)
                .collect();
            assert_eq!(
                combinators,
                vec![
                    None,
                    Some(Combinator::Child),
                    Some(Combinator::Descendant),
                    Some(Combinator::NextSibling),
                    Some(Combinator::SubsequentSibling),
                ]
            );
        }

        #[test]
        fn test_parse_list_and_tag_case() {
            let list = SelectorList::parse("DIV, Span ,iframe").unwrap();
            let tags: Vec<_> = list
                .groups()
                .iter()
                .map(|g| g.parts()[0].compound().tag().unwrap().to_string())
                .collect();
            assert_eq!(tags, vec!["div", "span", "iframe"]);
        }

        #[test]
        fn test_parse_quoted_attribute_with_escape() {
            let list = SelectorList::parse(r#"[data-label="say \"hi\""]"#).unwrap();
            let attr = &list.groups()[0].parts()[0].compound().attrs[0];
            assert_eq!(attr.matcher, AttrMatch::Equals("say \"hi\"".to_string()));
        }

        #[test]
        fn test_parse_not() {
            let list = SelectorList::parse("li:not(.disabled, [hidden])").unwrap();
            let pseudo = &list.groups()[0].parts()[0].compound().pseudos[0];
            assert!(matches!(pseudo, PseudoClass::Not(inner) if inner.len() == 2));
        }

        #[test]
        fn test_parse_rejects_malformed() {
            for bad in [
                "", "   ", "div >", "> div", "div,", ",div", "a..b", "#", "[href", "[href=]",
                "div::before", ":hover", "li:nth-of-type()", "li:nth-child(2n+)", "a:not(b",
                "'quoted'", "div!",
            ] {
                assert!(
                    matches!(
                        SelectorList::parse(bad),
                        Err(NavkeepError::InvalidSelector { .. })
                    ),
                    "{bad:?} should be rejected"
                );
            }
        }
    }

    mod nth_tests {
        use super::*;

        #[test]
        fn test_parse_nth_keywords() {
            assert_eq!(parse_nth("odd"), Some(Nth::new(2, 1)));
            assert_eq!(parse_nth("EVEN"), Some(Nth::new(2, 0)));
            assert_eq!(parse_nth(" 3 "), Some(Nth::new(0, 3)));
        }

        #[test]
        fn test_parse_nth_expressions() {
            assert_eq!(parse_nth("2n+1"), Some(Nth::new(2, 1)));
            assert_eq!(parse_nth("-n + 3"), Some(Nth::new(-1, 3)));
            assert_eq!(parse_nth("n"), Some(Nth::new(1, 0)));
            assert_eq!(parse_nth("3n-2"), Some(Nth::new(3, -2)));
            assert_eq!(parse_nth("2n3"), None);
            assert_eq!(parse_nth("xn"), None);
        }

        #[test]
        fn test_nth_matches() {
            assert!(Nth::new(0, 2).matches(2));
            assert!(!Nth::new(0, 2).matches(3));
            assert!(Nth::new(2, 1).matches(1));
            assert!(Nth::new(2, 1).matches(5));
            assert!(!Nth::new(2, 1).matches(4));
            // -n+3 selects the first three
            assert!(Nth::new(-1, 3).matches(1));
            assert!(Nth::new(-1, 3).matches(3));
            assert!(!Nth::new(-1, 3).matches(4));
        }

        #[test]
        fn test_nth_extreme_coefficients() {
            assert_eq!(
                parse_nth("n-9223372036854775808"),
                Some(Nth::new(1, i64::MIN))
            );
            assert!(Nth::new(1, i64::MIN).matches(1));
            assert!(!Nth::new(-1, i64::MIN).matches(1));
            assert!(!Nth::new(i64::MIN, i64::MAX).matches(3));
            assert!(Nth::new(-1, i64::MAX).matches(1));
            assert!(!Nth::new(0, i64::MIN).matches(1));
        }

        #[test]
        fn test_query_with_extreme_nth_does_not_panic() {
            let doc = crate::dom::Document::with_body();
            let body = doc.body().unwrap();
            body.append_child(&doc.create_element("div")).unwrap();
            body.append_child(&doc.create_element("div")).unwrap();

            let all = doc
                .query_selector_all("div:nth-child(n-9223372036854775808)")
                .unwrap();
            assert_eq!(all.len(), 2);
            let none = doc
                .query_selector_all("div:nth-last-of-type(-n-9223372036854775808)")
                .unwrap();
            assert!(none.is_empty());
        }
    }
}
