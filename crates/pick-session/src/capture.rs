//! Element snapshotting at pick time.

use dom_adapter::{NodeId, PageDom};
use pagehush_core_types::CapturedElement;

const TEXT_PREVIEW_CHARS: usize = 100;

/// Snapshot `node` for persistence: identity attributes, a trimmed text
/// preview, every attribute present right now, and the synthesized locator
/// set. The snapshot is born with `is_hidden` already set, matching the
/// pick flow where hiding is the immediate consequence of capture.
/// `None` when the node is not (or no longer) an element.
pub fn capture_element(page: &PageDom, node: NodeId) -> Option<CapturedElement> {
    let tag_name = page.tag_name(node)?;
    let selectors = locator_synth::synthesize(page, node);

    let text = page.text_content(node);
    let trimmed = text.trim();
    let text_preview = if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(TEXT_PREVIEW_CHARS).collect())
    };

    Some(CapturedElement {
        tag_name,
        id: page.element_id(node),
        class_name: page.class_attr(node),
        text_preview,
        attributes: page.attributes(node),
        selectors,
        is_hidden: true,
    })
}
