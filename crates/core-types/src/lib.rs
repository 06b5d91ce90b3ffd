//! Shared value types for the pagehush workspace.
//!
//! Everything here is a plain serde-friendly value: ids, the locator
//! encodings, the element snapshot taken at pick time, and the persisted
//! annotation record. No I/O, no runtime state.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type used at crate seams where a richer error would not
/// survive the crossing (event payloads, bus conversions).
#[derive(Debug, Error, Clone)]
pub enum HushError {
    #[error("{message}")]
    Message { message: String },
}

impl HushError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Opaque id of one persisted annotation record.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-runtime tab identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

/// Exact page URL as the page reported it, query and hash included.
///
/// Page identity is string equality on the original text; `parse` only
/// validates that the text is a well-formed URL and never normalises it.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PageUrl(String);

impl PageUrl {
    pub fn parse(raw: impl Into<String>) -> Result<Self, HushError> {
        let raw = raw.into();
        url::Url::parse(&raw)
            .map_err(|err| HushError::new(format!("invalid page url {raw:?}: {err}")))?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The locator encodings derived for one element.
///
/// `css` and `xpath` are always present; the other two are best-effort
/// diagnostic forms and are never used for re-resolution.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocatorSet {
    pub css: String,
    pub xpath: String,
    pub tag_class: Option<String>,
    pub attribute: Option<String>,
}

/// Snapshot of one DOM element taken at pick time.
///
/// Immutable after capture except `is_hidden`, which tracks the user's
/// visibility toggle for the element.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CapturedElement {
    pub tag_name: String,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub text_preview: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub selectors: LocatorSet,
    pub is_hidden: bool,
}

/// One persisted annotation: a captured element bound to the exact page it
/// was picked on.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationRecord {
    pub record_id: RecordId,
    pub element: CapturedElement,
    pub page_url: PageUrl,
    pub captured_at_ms: i64,
}

impl AnnotationRecord {
    /// Build a record stamped with the current wall-clock time. The id is
    /// minted at capture time by the picking side and becomes the storage
    /// key, so the same id travels through events and the store unchanged.
    pub fn created_now(record_id: RecordId, page_url: PageUrl, element: CapturedElement) -> Self {
        Self {
            record_id,
            element,
            page_url,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn css_locator(&self) -> &str {
        &self.element.selectors.css
    }
}
