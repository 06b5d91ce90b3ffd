use thiserror::Error;

use dom_adapter::DomError;
use pagehush_core_types::HushError;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("invalid xpath {xpath:?}: {reason}")]
    InvalidXPath { xpath: String, reason: String },
}

impl LocatorError {
    pub fn invalid_xpath(xpath: &str, reason: impl Into<String>) -> Self {
        Self::InvalidXPath {
            xpath: xpath.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<DomError> for LocatorError {
    fn from(value: DomError) -> Self {
        match value {
            DomError::InvalidSelector { selector, reason } => {
                Self::InvalidSelector { selector, reason }
            }
            other => Self::InvalidSelector {
                selector: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<LocatorError> for HushError {
    fn from(value: LocatorError) -> Self {
        HushError::new(value.to_string())
    }
}
