use thiserror::Error;

use pagehush_core_types::HushError;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("node is no longer part of the document")]
    NodeGone,
    #[error("page host is gone")]
    PageGone,
    #[error("failed to start page host: {0}")]
    HostSpawn(String),
}

impl DomError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<DomError> for HushError {
    fn from(value: DomError) -> Self {
        HushError::new(value.to_string())
    }
}
