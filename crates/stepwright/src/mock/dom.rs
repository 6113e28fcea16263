//! Minimal element tree used by [`super::MockDriver`].
//!
//! Enough of the DOM to resolve every [`Selector`] kind: implicit ARIA
//! roles, accessible names, labels, placeholders, text and test ids, plus a
//! small CSS subset (type, `#id`, `.class`, attribute selectors, descendant
//! and child combinators, selector lists).

use crate::locator::{normalize_whitespace, text_matches, Locator, Selector};
use crate::result::{StepwrightError, StepwrightResult};
use std::collections::BTreeMap;

/// Index of an element inside its [`MockDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub usize);

/// One element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockElement {
    /// Lowercase tag name
    pub tag: String,
    /// Own text (children contribute their text after it)
    pub text: String,
    /// Attributes, including `class`, `role`, `placeholder`, `data-testid`
    pub attributes: BTreeMap<String, String>,
    /// Text of the associated `<label>`
    pub label: Option<String>,
    /// Current input value
    pub value: String,
    /// Checked state
    pub checked: bool,
    /// Own visibility
    pub visible: bool,
    /// Document of an `<iframe>`
    pub content: Option<Box<MockDocument>>,
    parent: Option<ElementId>,
    removed: bool,
}

impl MockElement {
    /// Visible element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            visible: true,
            ..Self::default()
        }
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the `class` attribute
    #[must_use]
    pub fn class(self, classes: impl Into<String>) -> Self {
        self.attr("class", classes)
    }

    /// Set `data-testid`
    #[must_use]
    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.attr("data-testid", id)
    }

    /// Set `placeholder`
    #[must_use]
    pub fn placeholder(self, text: impl Into<String>) -> Self {
        self.attr("placeholder", text)
    }

    /// Associate label text
    #[must_use]
    pub fn label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(text.into());
        self
    }

    /// Set initial value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Mark hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Attach an iframe document
    #[must_use]
    pub fn frame_document(mut self, document: MockDocument) -> Self {
        self.content = Some(Box::new(document));
        self
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whitespace-separated classes
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class").unwrap_or_default().split_whitespace()
    }

    /// Add a class if missing
    pub fn add_class(&mut self, class: &str) {
        if !self.classes().any(|c| c == class) {
            let mut classes: Vec<&str> = self.classes().collect();
            classes.push(class);
            let joined = classes.join(" ");
            let _ = self.attributes.insert("class".to_string(), joined);
        }
    }

    /// Explicit or implicit ARIA role
    #[must_use]
    pub fn role(&self) -> Option<String> {
        if let Some(role) = self.attribute("role") {
            return Some(role.to_string());
        }
        let implicit = match self.tag.as_str() {
            "button" => "button",
            "a" if self.attributes.contains_key("href") => "link",
            "input" => match self.attribute("type").unwrap_or("text") {
                "checkbox" => "checkbox",
                "radio" => "radio",
                "button" | "submit" | "reset" => "button",
                _ => "textbox",
            },
            "textarea" => "textbox",
            "select" => "combobox",
            "option" => "option",
            "ul" | "ol" => "list",
            "li" => "listitem",
            "table" => "table",
            "tr" => "row",
            "td" => "cell",
            "th" => "columnheader",
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "img" => "img",
            "dialog" => "dialog",
            "nav" => "navigation",
            _ => return None,
        };
        Some(implicit.to_string())
    }
}

/// A document: URL, title and a flat arena of elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockDocument {
    /// Document URL
    pub url: String,
    /// Document title
    pub title: String,
    elements: Vec<MockElement>,
}

impl MockDocument {
    /// Empty document
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            elements: Vec::new(),
        }
    }

    /// Append an element under `parent` (root when `None`)
    pub fn append(&mut self, parent: Option<ElementId>, mut element: MockElement) -> ElementId {
        element.parent = parent;
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    /// Builder form of [`Self::append`] at the root
    #[must_use]
    pub fn with(mut self, element: MockElement) -> Self {
        let _ = self.append(None, element);
        self
    }

    /// Detach an element and its subtree
    pub fn remove(&mut self, id: ElementId) {
        let doomed: Vec<ElementId> = self
            .ids()
            .filter(|candidate| *candidate == id || self.is_descendant_of(*candidate, id))
            .collect();
        for id in doomed {
            self.elements[id.0].removed = true;
        }
    }

    /// Element by id
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&MockElement> {
        self.elements.get(id.0).filter(|e| !e.removed)
    }

    /// Mutable element by id
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut MockElement> {
        self.elements.get_mut(id.0).filter(|e| !e.removed)
    }

    /// Live element ids in document order
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.removed)
            .map(|(i, _)| ElementId(i))
    }

    /// Parent of `id`
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// Direct children of `id`
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.ids().filter(move |c| self.parent(*c) == Some(id))
    }

    /// Whether `id` is strictly inside `ancestor`
    #[must_use]
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = self.elements.get(id.0).and_then(|e| e.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.elements.get(p.0).and_then(|e| e.parent);
        }
        false
    }

    /// Own text followed by descendants' text
    #[must_use]
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        if let Some(element) = self.get(id) {
            out.push_str(&element.text);
            for child in self.children(id).collect::<Vec<_>>() {
                let child_text = self.text_content(child);
                if !out.is_empty() && !child_text.is_empty() {
                    out.push(' ');
                }
                out.push_str(&child_text);
            }
        }
        out
    }

    /// Visible when it and every ancestor are visible
    #[must_use]
    pub fn is_visible(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.get(c) {
                Some(e) if e.visible => current = e.parent,
                _ => return false,
            }
        }
        true
    }

    /// Accessible name
    #[must_use]
    pub fn accessible_name(&self, id: ElementId) -> String {
        let Some(element) = self.get(id) else {
            return String::new();
        };
        if let Some(label) = element.attribute("aria-label") {
            return label.to_string();
        }
        if let Some(label) = &element.label {
            return label.clone();
        }
        if matches!(element.tag.as_str(), "input" | "textarea" | "select") {
            return element
                .attribute("placeholder")
                .or_else(|| element.attribute("title"))
                .unwrap_or_default()
                .to_string();
        }
        if let Some(alt) = element.attribute("alt") {
            return alt.to_string();
        }
        normalize_whitespace(&self.text_content(id))
    }

    /// Resolve a locator within this document (frames are handled by the caller)
    pub fn resolve(&self, locator: &Locator) -> StepwrightResult<Vec<ElementId>> {
        let scopes = match &locator.parent {
            Some(parent) => Some(self.resolve(parent)?),
            None => None,
        };
        let mut matches = Vec::new();
        for id in self.ids() {
            if let Some(scopes) = &scopes {
                if !scopes.iter().any(|s| self.is_descendant_of(id, *s)) {
                    continue;
                }
            }
            if self.matches_selector(id, &locator.selector)? {
                matches.push(id);
            }
        }
        if let Selector::Text { text, exact } = &locator.selector {
            // Keep the innermost elements carrying the text
            let all = matches.clone();
            matches.retain(|id| {
                let own = self.get(*id).map(|e| e.text.as_str()).unwrap_or_default();
                text_matches(own, text, *exact)
                    || !all
                        .iter()
                        .any(|other| other != id && self.is_descendant_of(*other, *id))
            });
        }
        if let Some(needle) = &locator.has_text {
            matches.retain(|id| text_matches(&self.text_content(*id), needle, false));
        }
        Ok(match locator.index {
            Some(index) => matches.get(index).copied().into_iter().collect(),
            None => matches,
        })
    }

    fn matches_selector(&self, id: ElementId, selector: &Selector) -> StepwrightResult<bool> {
        let Some(element) = self.get(id) else {
            return Ok(false);
        };
        Ok(match selector {
            Selector::Css { css } => CssSelector::parse(css)?.matches(self, id),
            Selector::Role { role, name, exact } => {
                element.role().as_deref() == Some(role.as_str())
                    && name
                        .as_ref()
                        .map_or(true, |n| text_matches(&self.accessible_name(id), n, *exact))
            }
            Selector::Label { text, exact } => element
                .label
                .as_deref()
                .or_else(|| element.attribute("aria-label"))
                .is_some_and(|l| text_matches(l, text, *exact)),
            Selector::Placeholder { text, exact } => element
                .attribute("placeholder")
                .is_some_and(|p| text_matches(p, text, *exact)),
            Selector::Text { text, exact } => {
                !self.text_content(id).trim().is_empty()
                    && text_matches(&self.text_content(id), text, *exact)
            }
            Selector::TestId { id: test_id } => element.attribute("data-testid") == Some(test_id),
        })
    }
}

/// Parsed CSS selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelector {
    alternatives: Vec<Vec<(Combinator, Compound)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl CssSelector {
    /// Parse the supported subset
    pub fn parse(source: &str) -> StepwrightResult<Self> {
        let invalid = |message: &str| StepwrightError::InvalidExpression {
            expression: source.to_string(),
            message: message.to_string(),
        };
        let mut alternatives = Vec::new();
        for part in split_top_level(source, ',') {
            let mut chain = Vec::new();
            let mut pending = Combinator::Descendant;
            let mut chars = part.trim().chars().peekable();
            let mut current = Compound::default();
            let mut has_current = false;
            while let Some(c) = chars.next() {
                match c {
                    ' ' | '\t' | '\n' => {
                        if has_current {
                            chain.push((pending, std::mem::take(&mut current)));
                            has_current = false;
                            pending = Combinator::Descendant;
                        }
                    }
                    '>' => {
                        if has_current {
                            chain.push((pending, std::mem::take(&mut current)));
                            has_current = false;
                        }
                        pending = Combinator::Child;
                    }
                    '#' => {
                        current.id = Some(take_ident(&mut chars));
                        has_current = true;
                    }
                    '.' => {
                        current.classes.push(take_ident(&mut chars));
                        has_current = true;
                    }
                    '*' => has_current = true,
                    '[' => {
                        let mut inner = String::new();
                        for c in chars.by_ref() {
                            if c == ']' {
                                break;
                            }
                            inner.push(c);
                        }
                        let (name, value) = match inner.split_once('=') {
                            Some((n, v)) => (
                                n.trim().to_string(),
                                Some(v.trim().trim_matches(|q| q == '"' || q == '\'').to_string()),
                            ),
                            None => (inner.trim().to_string(), None),
                        };
                        if name.is_empty() {
                            return Err(invalid("empty attribute selector"));
                        }
                        current.attributes.push((name, value));
                        has_current = true;
                    }
                    c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                        let mut tag = c.to_string();
                        tag.push_str(&take_ident(&mut chars));
                        current.tag = Some(tag.to_lowercase());
                        has_current = true;
                    }
                    other => return Err(invalid(&format!("unsupported character {other:?}"))),
                }
            }
            if has_current {
                chain.push((pending, current));
            }
            if chain.is_empty() {
                return Err(invalid("empty selector"));
            }
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }

    /// Whether the element matches any alternative
    #[must_use]
    pub fn matches(&self, doc: &MockDocument, id: ElementId) -> bool {
        self.alternatives
            .iter()
            .any(|chain| matches_chain(doc, id, chain))
    }
}

fn matches_chain(doc: &MockDocument, id: ElementId, chain: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, last), rest)) = chain.split_last() else {
        return true;
    };
    if !matches_compound(doc, id, last) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => doc
            .parent(id)
            .is_some_and(|p| matches_chain(doc, p, rest)),
        Combinator::Descendant => {
            let mut current = doc.parent(id);
            while let Some(p) = current {
                if matches_chain(doc, p, rest) {
                    return true;
                }
                current = doc.parent(p);
            }
            false
        }
    }
}

fn matches_compound(doc: &MockDocument, id: ElementId, compound: &Compound) -> bool {
    let Some(element) = doc.get(id) else {
        return false;
    };
    compound.tag.as_ref().map_or(true, |t| &element.tag == t)
        && compound
            .id
            .as_ref()
            .map_or(true, |i| element.attribute("id") == Some(i.as_str()))
        && compound
            .classes
            .iter()
            .all(|c| element.classes().any(|own| own == c))
        && compound.attributes.iter().all(|(name, value)| {
            match (element.attribute(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
            let _ = chars.next();
        } else {
            break;
        }
    }
    out
}

fn split_top_level(source: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, c) if c == separator && depth == 0 => {
                parts.push(&source[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table_doc() -> MockDocument {
        let mut doc = MockDocument::new("https://x/", "Users");
        let table = doc.append(None, MockElement::new("table"));
        let tbody = doc.append(Some(table), MockElement::new("tbody"));
        for (name, role) in [("Ann", "Admin"), ("Bob", "Admin")] {
            let tr = doc.append(Some(tbody), MockElement::new("tr"));
            let _ = doc.append(Some(tr), MockElement::new("td").text(name));
            let _ = doc.append(Some(tr), MockElement::new("td").text(role));
        }
        doc
    }

    mod css_tests {
        use super::*;

        #[test]
        fn test_descendant_and_child() {
            let doc = table_doc();
            let rows = doc.resolve(&Locator::css("table tbody tr")).unwrap();
            assert_eq!(rows.len(), 2);
            let direct = doc.resolve(&Locator::css("table > tr")).unwrap();
            assert!(direct.is_empty());
            let cells = doc.resolve(&Locator::css("tbody > tr > td")).unwrap();
            assert_eq!(cells.len(), 4);
        }

        #[test]
        fn test_attribute_class_and_id() {
            let doc = MockDocument::new("u", "t")
                .with(MockElement::new("input").attr("id", "email").class("field wide"))
                .with(MockElement::new("iframe").attr("name", "pay"));
            assert_eq!(doc.resolve(&Locator::css("#email")).unwrap().len(), 1);
            assert_eq!(doc.resolve(&Locator::css("input.wide")).unwrap().len(), 1);
            assert_eq!(doc.resolve(&Locator::css("iframe[name=\"pay\"]")).unwrap().len(), 1);
            assert_eq!(doc.resolve(&Locator::css("iframe[name]")).unwrap().len(), 1);
            assert_eq!(doc.resolve(&Locator::css("input, iframe")).unwrap().len(), 2);
        }

        #[test]
        fn test_invalid_selector() {
            assert!(CssSelector::parse("div:has-text('x')").is_err());
            assert!(CssSelector::parse("").is_err());
        }
    }

    mod semantic_tests {
        use super::*;

        #[test]
        fn test_role_implicit_and_name() {
            let doc = MockDocument::new("u", "t")
                .with(MockElement::new("button").text("Save"))
                .with(MockElement::new("button").text("Save draft"))
                .with(MockElement::new("a").attr("href", "/").text("Home"));
            let exact = doc.resolve(&Locator::role_named("button", "Save", true)).unwrap();
            assert_eq!(exact.len(), 1);
            let loose = doc.resolve(&Locator::role_named("button", "save", false)).unwrap();
            assert_eq!(loose.len(), 2);
            assert_eq!(doc.resolve(&Locator::role("link")).unwrap().len(), 1);
        }

        #[test]
        fn test_text_prefers_innermost() {
            let mut doc = MockDocument::new("u", "t");
            let div = doc.append(None, MockElement::new("div"));
            let _ = doc.append(Some(div), MockElement::new("span").text("Hello"));
            let found = doc.resolve(&Locator::text("Hello", true)).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(doc.get(found[0]).unwrap().tag, "span");
        }

        #[test]
        fn test_has_text_filter_and_nth() {
            let doc = table_doc();
            let bob = doc
                .resolve(&Locator::css("tr").filter_has_text("bob"))
                .unwrap();
            assert_eq!(bob.len(), 1);
            let second = doc.resolve(&Locator::css("td").nth(1)).unwrap();
            assert_eq!(doc.text_content(second[0]), "Admin");
            assert!(doc.resolve(&Locator::css("td").nth(9)).unwrap().is_empty());
        }

        #[test]
        fn test_parent_scope() {
            let doc = table_doc();
            let loc = Locator::css("tr").nth(1).locator(Locator::css("td"));
            let cells = doc.resolve(&loc).unwrap();
            assert_eq!(doc.text_content(cells[0]), "Bob");
        }

        #[test]
        fn test_resolution_is_stable() {
            let doc = table_doc();
            let loc = Locator::css("td").nth(2);
            assert_eq!(doc.resolve(&loc).unwrap(), doc.resolve(&loc).unwrap());
        }

        #[test]
        fn test_visibility_inherits() {
            let mut doc = MockDocument::new("u", "t");
            let hidden = doc.append(None, MockElement::new("div").hidden());
            let child = doc.append(Some(hidden), MockElement::new("span").text("x"));
            assert!(!doc.is_visible(child));
        }

        #[test]
        fn test_remove_subtree() {
            let mut doc = table_doc();
            let rows = doc.resolve(&Locator::css("tr")).unwrap();
            doc.remove(rows[0]);
            assert_eq!(doc.resolve(&Locator::css("td")).unwrap().len(), 2);
        }

        #[test]
        fn test_add_class() {
            let mut el = MockElement::new("li").class("todo");
            el.add_class("completed");
            el.add_class("completed");
            assert_eq!(el.attribute("class"), Some("todo completed"));
        }
    }
}
