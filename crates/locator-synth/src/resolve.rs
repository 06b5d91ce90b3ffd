//! Resolution of freshly synthesized locators back to nodes.
//!
//! CSS goes through the real selector engine. XPath is resolved against the
//! exact subset grammar the builder emits: absolute segment paths with
//! optional `[@id="…"]` and same-tag `[k]` predicates, plus the
//! `//*[@id="…"]` short-circuit. An id-anchored first segment anchors at
//! that element; a plain path anchors at the document root element.

use dom_adapter::{NodeId, PageDom};

use crate::errors::LocatorError;

pub fn resolve_css(page: &PageDom, css: &str) -> Result<Vec<NodeId>, LocatorError> {
    page.try_select(css).map_err(Into::into)
}

pub fn resolve_xpath(page: &PageDom, xpath: &str) -> Result<Vec<NodeId>, LocatorError> {
    if let Some(id) = xpath
        .strip_prefix("//*[@id=\"")
        .and_then(|rest| rest.strip_suffix("\"]"))
    {
        return Ok(elements_with_id(page, id));
    }

    let body = xpath
        .strip_prefix('/')
        .ok_or_else(|| LocatorError::invalid_xpath(xpath, "expected a leading '/'"))?;
    if body.is_empty() {
        return Err(LocatorError::invalid_xpath(xpath, "empty path"));
    }

    let segments = body
        .split('/')
        .map(|raw| parse_segment(xpath, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut current = match &segments[0] {
        Segment {
            tag,
            predicate: Some(Predicate::Id(id)),
        } => elements_with_id(page, id)
            .into_iter()
            .filter(|node| page.tag_name(*node).as_deref() == Some(tag.as_str()))
            .collect(),
        first => children_matching(page, page.root_element_id(), first),
    };

    for segment in &segments[1..] {
        let mut next = Vec::new();
        for node in current {
            next.extend(children_matching(page, node, segment));
        }
        current = next;
    }
    Ok(current)
}

struct Segment {
    tag: String,
    predicate: Option<Predicate>,
}

enum Predicate {
    Id(String),
    Index(usize),
}

fn parse_segment(xpath: &str, raw: &str) -> Result<Segment, LocatorError> {
    let Some((tag, rest)) = raw.split_once('[') else {
        if raw.is_empty() {
            return Err(LocatorError::invalid_xpath(xpath, "empty segment"));
        }
        return Ok(Segment {
            tag: raw.to_string(),
            predicate: None,
        });
    };

    let inner = rest
        .strip_suffix(']')
        .ok_or_else(|| LocatorError::invalid_xpath(xpath, "unterminated predicate"))?;

    let predicate = if let Some(id) = inner
        .strip_prefix("@id=\"")
        .and_then(|value| value.strip_suffix('"'))
    {
        Predicate::Id(id.to_string())
    } else {
        let index: usize = inner
            .parse()
            .map_err(|_| LocatorError::invalid_xpath(xpath, "unsupported predicate"))?;
        if index == 0 {
            return Err(LocatorError::invalid_xpath(xpath, "index is 1-based"));
        }
        Predicate::Index(index)
    };

    Ok(Segment {
        tag: tag.to_string(),
        predicate: Some(predicate),
    })
}

fn children_matching(page: &PageDom, parent: NodeId, segment: &Segment) -> Vec<NodeId> {
    let same_tag: Vec<NodeId> = page
        .child_elements(parent)
        .into_iter()
        .filter(|child| page.tag_name(*child).as_deref() == Some(segment.tag.as_str()))
        .collect();

    match &segment.predicate {
        None => same_tag,
        Some(Predicate::Index(index)) => same_tag.get(index - 1).copied().into_iter().collect(),
        Some(Predicate::Id(id)) => same_tag
            .into_iter()
            .filter(|child| page.element_id(*child).as_deref() == Some(id.as_str()))
            .collect(),
    }
}

fn elements_with_id(page: &PageDom, id: &str) -> Vec<NodeId> {
    page.all_elements()
        .into_iter()
        .filter(|node| page.element_id(*node).as_deref() == Some(id))
        .collect()
}
