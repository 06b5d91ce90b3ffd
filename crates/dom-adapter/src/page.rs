//! Mutable document model backed by `scraper`.

use std::collections::{BTreeMap, HashMap};

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::errors::DomError;

/// One loaded page: the parsed element tree plus an inline-style overlay.
///
/// Selector matching runs against the real tree; the overlay carries the
/// style mutations (visibility, pointer-events) applied after load, the way
/// inline `style` edits would on a live page.
pub struct PageDom {
    html: Html,
    styles: HashMap<NodeId, BTreeMap<String, String>>,
}

impl PageDom {
    pub fn parse_document(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            styles: HashMap::new(),
        }
    }

    /// All elements matching `css`, in document order. An unparsable
    /// selector is an error; callers that treat it as "no match" decide
    /// that themselves.
    pub fn try_select(&self, css: &str) -> Result<Vec<NodeId>, DomError> {
        let selector =
            Selector::parse(css).map_err(|err| DomError::invalid_selector(css, err))?;
        Ok(self.html.select(&selector).map(|el| el.id()).collect())
    }

    /// Match count with an unparsable selector counting as zero matches.
    pub fn match_count(&self, css: &str) -> usize {
        self.try_select(css).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn first_match(&self, css: &str) -> Option<NodeId> {
        self.try_select(css).ok().and_then(|ids| ids.into_iter().next())
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node).and_then(ElementRef::wrap)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|el| el.value().name().to_lowercase())
    }

    /// The element's id attribute, `None` when absent or empty.
    pub fn element_id(&self, node: NodeId) -> Option<String> {
        self.element(node)
            .and_then(|el| el.value().id())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    /// Raw class attribute text, `None` when absent or empty.
    pub fn class_attr(&self, node: NodeId) -> Option<String> {
        self.element(node)
            .and_then(|el| el.value().attr("class"))
            .filter(|class| !class.trim().is_empty())
            .map(str::to_string)
    }

    /// Whitespace-split class tokens, in attribute order.
    pub fn class_tokens(&self, node: NodeId) -> Vec<String> {
        self.class_attr(node)
            .map(|attr| attr.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn attributes(&self, node: NodeId) -> BTreeMap<String, String> {
        self.element(node)
            .map(|el| {
                el.value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Concatenated descendant text, untrimmed.
    pub fn text_content(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default()
    }

    /// Nearest ancestor that is an element.
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.html.tree.get(node)?.parent();
        while let Some(parent) = current {
            if parent.value().is_element() {
                return Some(parent.id());
            }
            current = parent.parent();
        }
        None
    }

    /// Element children of `node`, in document order.
    pub fn child_elements(&self, node: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(node)
            .map(|parent| {
                parent
                    .children()
                    .filter(|child| child.value().is_element())
                    .map(|child| child.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every element in the document, in document order.
    pub fn all_elements(&self) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect()
    }

    /// The document root element (`<html>` for parsed documents).
    pub fn root_element_id(&self) -> NodeId {
        self.html.root_element().id()
    }

    pub fn body_id(&self) -> Option<NodeId> {
        self.first_match("body")
    }

    pub fn is_root_element(&self, node: NodeId) -> bool {
        node == self.root_element_id()
    }

    pub fn is_body(&self, node: NodeId) -> bool {
        self.body_id() == Some(node)
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.styles
            .entry(node)
            .or_default()
            .insert(property.to_string(), value.to_string());
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.styles
            .get(&node)
            .and_then(|props| props.get(property))
            .cloned()
    }

    /// Apply the given style properties to every element matching `css`.
    /// Returns how many elements matched; zero matches is not an error.
    pub fn apply_styles(
        &mut self,
        css: &str,
        props: &[(String, String)],
    ) -> Result<usize, DomError> {
        let matches = self.try_select(css)?;
        for node in &matches {
            for (property, value) in props {
                self.set_style(*node, property, value);
            }
        }
        Ok(matches.len())
    }

    /// Parse `source` as an HTML fragment and append its top-level nodes as
    /// children of `parent`. Models content the page mounts after load.
    /// Returns the ids of the appended top-level nodes.
    pub fn mount_fragment(
        &mut self,
        parent: NodeId,
        source: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        if self.html.tree.get(parent).is_none() {
            return Err(DomError::NodeGone);
        }
        let fragment = Html::parse_fragment(source);
        let top_level: Vec<NodeId> = fragment.root_element().children().map(|c| c.id()).collect();

        let mut mounted = Vec::with_capacity(top_level.len());
        for src_id in top_level {
            if let Some(src) = fragment.tree.get(src_id) {
                mounted.push(append_copy(&mut self.html.tree, parent, src)?);
            }
        }
        Ok(mounted)
    }

    pub fn mount_fragment_at(
        &mut self,
        parent_css: &str,
        source: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let parent = self
            .first_match(parent_css)
            .ok_or(DomError::NodeGone)?;
        self.mount_fragment(parent, source)
    }
}

/// Deep-copy `src` (from another tree) under `parent` in `dst`.
fn append_copy(
    dst: &mut Tree<Node>,
    parent: NodeId,
    src: NodeRef<'_, Node>,
) -> Result<NodeId, DomError> {
    let new_id = {
        let mut parent_mut = dst.get_mut(parent).ok_or(DomError::NodeGone)?;
        parent_mut.append(src.value().clone()).id()
    };
    for child in src.children() {
        append_copy(dst, new_id, child)?;
    }
    Ok(new_id)
}
