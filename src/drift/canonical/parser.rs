//! Structural document tree and the parser capability behind it

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html};
use thiserror::Error;

/// Nesting depth beyond which a document is treated as malformed
pub const MAX_TREE_DEPTH: usize = 512;

/// The parser could not build a usable structural tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Document nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("Document has no root element")]
    NoRoot,
}

/// Node in an owned document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Document,
    Element {
        /// Lowercase local name
        name: String,
        /// Attributes sorted by name
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

impl DomNode {
    pub fn tag(&self) -> Option<&str> {
        match self {
            DomNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            DomNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Parses raw markup into a [`ParsedDocument`]
pub trait DocumentParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedDocument, MarkupError>;
}

/// A mutable structural tree with the operations canonicalization needs
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    tree: Tree<DomNode>,
}

impl ParsedDocument {
    pub fn new(tree: Tree<DomNode>) -> Self {
        Self { tree }
    }

    /// Remove every element with the given tag name, subtree included.
    /// Returns the number removed.
    pub fn remove_by_tag(&mut self, tag: &str) -> usize {
        self.remove_where(|node| node.tag() == Some(tag))
    }

    /// Remove every element matching `predicate`, subtree included.
    ///
    /// Matches are collected in document order before detaching; a match
    /// nested inside another match goes away with its ancestor.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&DomNode) -> bool,
    {
        let ids: Vec<NodeId> = self
            .tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), DomNode::Element { .. }) && predicate(n.value()))
            .map(|n| n.id())
            .collect();

        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
        removed
    }

    /// Drop attribute `key` from every element in the tree
    pub fn strip_attribute(&mut self, key: &str) {
        let ids: Vec<NodeId> = self.tree.root().descendants().map(|n| n.id()).collect();
        for id in ids {
            if let Some(mut node) = self.tree.get_mut(id) {
                if let DomNode::Element { attrs, .. } = node.value() {
                    attrs.retain(|(k, _)| k != key);
                }
            }
        }
    }

    /// First content landmark in document order: a `main` element, else an
    /// element with `role="main"`
    pub fn find_landmark(&self) -> Option<NodeId> {
        let root = self.tree.root();
        root.descendants()
            .find(|n| n.value().tag() == Some("main"))
            .or_else(|| {
                root.descendants().find(|n| {
                    n.value()
                        .attr("role")
                        .map(|r| r.trim().eq_ignore_ascii_case("main"))
                        .unwrap_or(false)
                })
            })
            .map(|n| n.id())
    }

    /// Text under `scope` (whole document when `None`): each text node
    /// trimmed, empty ones skipped, joined by single spaces
    pub fn extract_text(&self, scope: Option<NodeId>) -> String {
        let start = scope
            .and_then(|id| self.tree.get(id))
            .unwrap_or_else(|| self.tree.root());

        let mut parts: Vec<&str> = Vec::new();
        for node in start.descendants() {
            if let DomNode::Text(text) = node.value() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
        }
        parts.join(" ")
    }

    /// Number of attached element nodes
    pub fn element_count(&self) -> usize {
        self.tree
            .root()
            .descendants()
            .filter(|n| matches!(n.value(), DomNode::Element { .. }))
            .count()
    }

    /// Attribute names still present on any attached element
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tree
            .root()
            .descendants()
            .filter_map(|n| match n.value() {
                DomNode::Element { attrs, .. } => Some(attrs.iter().map(|(k, _)| k.clone())),
                _ => None,
            })
            .flatten()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn root(&self) -> NodeRef<'_, DomNode> {
        self.tree.root()
    }
}

/// [`DocumentParser`] backed by `scraper` (html5ever)
#[derive(Debug, Clone)]
pub struct ScraperParser {
    max_depth: usize,
}

impl ScraperParser {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_TREE_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    fn copy_element(
        &self,
        element: ElementRef<'_>,
        tree: &mut Tree<DomNode>,
        parent: NodeId,
        depth: usize,
    ) -> Result<(), MarkupError> {
        if depth > self.max_depth {
            return Err(MarkupError::TooDeep(self.max_depth));
        }

        let value = element.value();
        let mut attrs: Vec<(String, String)> = value
            .attrs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        attrs.sort();

        let node = DomNode::Element {
            name: value.name().to_ascii_lowercase(),
            attrs,
        };
        let id = match tree.get_mut(parent) {
            Some(mut parent) => parent.append(node).id(),
            None => return Err(MarkupError::NoRoot),
        };

        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.copy_element(child_element, tree, id, depth + 1)?;
            } else if let Some(text) = child.value().as_text() {
                if let Some(mut node) = tree.get_mut(id) {
                    node.append(DomNode::Text(text.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl Default for ScraperParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for ScraperParser {
    fn parse(&self, raw: &str) -> Result<ParsedDocument, MarkupError> {
        let html = Html::parse_document(raw);
        let root_element = html.root_element();

        let mut tree = Tree::new(DomNode::Document);
        let root_id = tree.root().id();
        self.copy_element(root_element, &mut tree, root_id, 1)?;

        Ok(ParsedDocument::new(tree))
    }
}
