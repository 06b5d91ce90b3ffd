//! XPath encoding of an element's location.

use dom_adapter::{NodeId, PageDom};

/// Build the XPath locator for `node`.
///
/// An element with an id short-circuits to `//*[@id="…"]`. Otherwise the
/// path ascends to (but excludes) the document root element; an ancestor id
/// ends the ascent with `[@id="…"]`, and a 1-based same-tag index `[k]` is
/// appended wherever the parent has more than one child of that tag.
pub fn xpath_selector(page: &PageDom, node: NodeId) -> String {
    if let Some(id) = page.element_id(node) {
        return format!("//*[@id=\"{id}\"]");
    }

    let mut segments = Vec::new();
    let mut current = Some(node);

    while let Some(cur) = current {
        if page.is_root_element(cur) {
            break;
        }

        let mut segment = page.tag_name(cur).unwrap_or_else(|| "*".to_string());

        if let Some(id) = page.element_id(cur) {
            segment.push_str(&format!("[@id=\"{id}\"]"));
            segments.push(segment);
            break;
        }

        if let Some(parent) = page.parent_element(cur) {
            let tag = page.tag_name(cur);
            let same_tag: Vec<NodeId> = page
                .child_elements(parent)
                .into_iter()
                .filter(|sibling| page.tag_name(*sibling) == tag)
                .collect();
            if same_tag.len() > 1 {
                if let Some(position) = same_tag.iter().position(|sibling| *sibling == cur) {
                    segment.push_str(&format!("[{}]", position + 1));
                }
            }
        }

        segments.push(segment);
        current = page.parent_element(cur);
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}
