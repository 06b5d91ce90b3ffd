use pagehush_core_types::{AnnotationRecord, RecordId};

/// Key prefix marking annotation records, so they can be told apart from
/// anything else sharing the same persisted map by a prefix scan.
pub const RECORD_KEY_PREFIX: &str = "annotation/";

pub fn record_key(record_id: &RecordId) -> String {
    format!("{RECORD_KEY_PREFIX}{record_id}")
}

/// One observed store mutation. `old`/`new` presence distinguishes an
/// addition (no old value) from an in-place mutation (both) from a removal
/// (no new value).
#[derive(Clone, Debug)]
pub struct StoreChange {
    pub record_id: RecordId,
    pub old: Option<AnnotationRecord>,
    pub new: Option<AnnotationRecord>,
}

impl StoreChange {
    pub fn is_addition(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_mutation(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }

    pub fn is_removal(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }
}
