use thiserror::Error;

use pagehush_annotation_store::StoreError;
use pagehush_core_types::{HushError, TabId};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no live page context for {0}")]
    ContextUnreachable(TabId),
    #[error("page context channel closed for {0}")]
    ChannelClosed(TabId),
    #[error("no active tab")]
    NoActiveTab,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for HushError {
    fn from(value: BridgeError) -> Self {
        HushError::new(value.to_string())
    }
}
