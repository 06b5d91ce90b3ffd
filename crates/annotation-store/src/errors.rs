use thiserror::Error;

use pagehush_core_types::HushError;

#[derive(Clone, Debug, Error)]
pub enum StoreErrorKind {
    #[error("duplicate record id: {0}")]
    DuplicateRecord(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("corrupt store file: {0}")]
    Corrupt(String),
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct StoreError(pub StoreErrorKind);

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrorKind {
        &self.0
    }
}

impl From<StoreErrorKind> for StoreError {
    fn from(kind: StoreErrorKind) -> Self {
        StoreError(kind)
    }
}

impl From<StoreError> for HushError {
    fn from(value: StoreError) -> Self {
        HushError::new(value.to_string())
    }
}
