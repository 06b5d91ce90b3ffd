//! Locator synthesis - derive stable, minimal, unique locators for DOM nodes
//!
//! Two independent encodings are always produced:
//! - CSS: a chain of strategies tried in strict priority order, each
//!   validated for whole-document uniqueness, with a structural path as the
//!   final fallback.
//! - XPath: id short-circuit or an ancestor walk with same-tag indexing.
//!
//! Synthesis is pure and never fails; the resolvers in [`resolve`] exist so
//! freshly produced locators can be checked back against the same document.

pub mod css;
pub mod errors;
pub mod resolve;
pub mod xpath;

pub use errors::LocatorError;
pub use resolve::{resolve_css, resolve_xpath};

use dom_adapter::{NodeId, PageDom};
use pagehush_core_types::LocatorSet;

/// Derive every locator encoding for `node`. Deterministic for a fixed
/// document state; the diagnostic `tag_class`/`attribute` forms are
/// best-effort and may be absent.
pub fn synthesize(page: &PageDom, node: NodeId) -> LocatorSet {
    LocatorSet {
        css: css::css_selector(page, node),
        xpath: xpath::xpath_selector(page, node),
        tag_class: css::tag_class_form(page, node),
        attribute: css::attribute_form(page, node),
    }
}
