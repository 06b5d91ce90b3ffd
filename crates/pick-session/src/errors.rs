use thiserror::Error;

use pagehush_core_types::HushError;

#[derive(Debug, Error)]
pub enum PickError {
    #[error("inspector already engaged")]
    AlreadyEngaged,
    #[error("inspector failed to engage: {0}")]
    EngageFailed(String),
}

impl From<PickError> for HushError {
    fn from(value: PickError) -> Self {
        HushError::new(value.to_string())
    }
}
