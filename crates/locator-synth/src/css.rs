//! CSS selector strategies, tried in strict priority order.

use dom_adapter::{NodeId, PageDom};

/// Build the CSS locator for `node`.
///
/// Strategies in order, first one that matches exactly one element in the
/// whole document wins: `#id`, `#id.classes`, `[id="…"]`, `tag.classes`,
/// then the structural path fallback (which skips the uniqueness check).
/// A selector that fails to parse counts as a non-match, never an error.
pub fn css_selector(page: &PageDom, node: NodeId) -> String {
    let tag = page.tag_name(node).unwrap_or_else(|| "*".to_string());
    let classes = page.class_tokens(node);

    if let Some(id) = page.element_id(node) {
        let candidate = format!("#{id}");
        if is_unique(page, &candidate) {
            return candidate;
        }

        if !classes.is_empty() {
            let candidate = format!("#{}.{}", id, classes.join("."));
            if is_unique(page, &candidate) {
                return candidate;
            }
        }

        let candidate = format!("[id=\"{id}\"]");
        if is_unique(page, &candidate) {
            return candidate;
        }
    }

    if !classes.is_empty() {
        let candidate = format!("{}.{}", tag, classes.join("."));
        if is_unique(page, &candidate) {
            return candidate;
        }
    }

    structural_path(page, node)
}

/// `tag.class1.class2…` over every class token, when the element has any.
pub fn tag_class_form(page: &PageDom, node: NodeId) -> Option<String> {
    let classes = page.class_tokens(node);
    if classes.is_empty() {
        return None;
    }
    let tag = page.tag_name(node)?;
    Some(format!("{}.{}", tag, classes.join(".")))
}

/// `[id="…"]` when the element has an id.
pub fn attribute_form(page: &PageDom, node: NodeId) -> Option<String> {
    page.element_id(node).map(|id| format!("[id=\"{id}\"]"))
}

fn is_unique(page: &PageDom, css: &str) -> bool {
    page.try_select(css)
        .map(|matches| matches.len() == 1)
        .unwrap_or(false)
}

/// Path fallback: ancestors up to (excluding) the body, each segment a tag
/// name plus an id stop, up to two class tokens, and an `:nth-child` index
/// among all element siblings whenever there is more than one.
fn structural_path(page: &PageDom, node: NodeId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node);

    while let Some(cur) = current {
        if page.is_body(cur) || page.is_root_element(cur) {
            break;
        }

        let mut segment = page.tag_name(cur).unwrap_or_else(|| "*".to_string());

        if let Some(id) = page.element_id(cur) {
            segment.push('#');
            segment.push_str(&id);
            segments.push(segment);
            break;
        }

        let classes = page.class_tokens(cur);
        if !classes.is_empty() {
            let kept: Vec<String> = classes.into_iter().take(2).collect();
            segment.push('.');
            segment.push_str(&kept.join("."));
        }

        if let Some(parent) = page.parent_element(cur) {
            let siblings = page.child_elements(parent);
            if siblings.len() > 1 {
                if let Some(position) = siblings.iter().position(|sibling| *sibling == cur) {
                    segment.push_str(&format!(":nth-child({})", position + 1));
                }
            }
        }

        segments.push(segment);
        current = page.parent_element(cur);
    }

    segments.reverse();
    segments.join(" > ")
}
