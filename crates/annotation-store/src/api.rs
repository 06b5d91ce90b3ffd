use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, error};

use pagehush_core_types::{AnnotationRecord, PageUrl, RecordId};

use crate::errors::{StoreError, StoreErrorKind};
use crate::model::{record_key, StoreChange, RECORD_KEY_PREFIX};

pub type StoreResult<T> = Result<T, StoreError>;

const CHANGE_FEED_DEPTH: usize = 64;

/// The annotation persistence contract.
///
/// `set_hidden` and `remove` are keyed by (page, css locator) and act on the
/// first record the backing map yields; when several records on one page
/// share a locator, only one is touched.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Persist a new record under its own id. Never overwrites; identical
    /// selectors on the same page may coexist.
    async fn upsert_new(&self, record: AnnotationRecord) -> StoreResult<RecordId>;

    /// Every record for exactly this page URL, newest capture first.
    async fn list_by_page(&self, page_url: &PageUrl) -> StoreResult<Vec<AnnotationRecord>>;

    /// Flip `is_hidden` on the first matching record; `false` when nothing
    /// matched.
    async fn set_hidden(
        &self,
        page_url: &PageUrl,
        css_locator: &str,
        hidden: bool,
    ) -> StoreResult<bool>;

    /// Delete the first matching record; `false` when nothing matched.
    async fn remove(&self, page_url: &PageUrl, css_locator: &str) -> StoreResult<bool>;

    /// Change feed covering the whole store, fired on every add, mutate,
    /// and remove.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// In-memory store with optional JSON write-through persistence.
///
/// Records live in a map keyed `annotation/<record-id>`; the key prefix is
/// how annotation records are told apart from any other data sharing a
/// persisted file, and stays an internal detail of this backend.
pub struct MemoryAnnotationStore {
    records: RwLock<BTreeMap<String, AnnotationRecord>>,
    changes: broadcast::Sender<StoreChange>,
    persist_path: Option<PathBuf>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(CHANGE_FEED_DEPTH);
        Arc::new(Self {
            records: RwLock::new(BTreeMap::new()),
            changes,
            persist_path: None,
        })
    }

    /// Open a store backed by a JSON file, loading whatever annotation
    /// records the file already holds. A missing file is an empty store.
    pub fn with_persistence(path: impl Into<PathBuf>) -> StoreResult<Arc<Self>> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<BTreeMap<String, AnnotationRecord>>(&text)
                .map_err(|err| StoreErrorKind::Corrupt(err.to_string()))?
                .into_iter()
                .filter(|(key, _)| key.starts_with(RECORD_KEY_PREFIX))
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreErrorKind::Persistence(err.to_string()).into()),
        };

        let (changes, _) = broadcast::channel(CHANGE_FEED_DEPTH);
        Ok(Arc::new(Self {
            records: RwLock::new(records),
            changes,
            persist_path: Some(path),
        }))
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    fn flush(&self, records: &BTreeMap<String, AnnotationRecord>) -> StoreResult<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(records)
            .map_err(|err| StoreErrorKind::Persistence(err.to_string()))?;
        std::fs::write(path, json).map_err(|err| {
            error!(path = %path.display(), error = %err, "failed to persist annotation records");
            StoreError::from(StoreErrorKind::Persistence(err.to_string()))
        })
    }

    fn notify(&self, change: StoreChange) {
        // nobody listening is fine; the feed only serves live subscribers
        let _ = self.changes.send(change);
    }

    fn find_first(
        records: &BTreeMap<String, AnnotationRecord>,
        page_url: &PageUrl,
        css_locator: &str,
    ) -> Option<(String, AnnotationRecord)> {
        records
            .iter()
            .find(|(_, record)| {
                record.page_url == *page_url && record.element.selectors.css == css_locator
            })
            .map(|(key, record)| (key.clone(), record.clone()))
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn upsert_new(&self, record: AnnotationRecord) -> StoreResult<RecordId> {
        let key = record_key(&record.record_id);
        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(StoreErrorKind::DuplicateRecord(record.record_id.to_string()).into());
        }

        let mut next = records.clone();
        next.insert(key, record.clone());
        self.flush(&next)?;
        *records = next;
        drop(records);

        debug!(record = %record.record_id, page = %record.page_url, "annotation record created");
        self.notify(StoreChange {
            record_id: record.record_id.clone(),
            old: None,
            new: Some(record.clone()),
        });
        Ok(record.record_id)
    }

    async fn list_by_page(&self, page_url: &PageUrl) -> StoreResult<Vec<AnnotationRecord>> {
        let records = self.records.read();
        let mut matching: Vec<AnnotationRecord> = records
            .iter()
            .filter(|(key, _)| key.starts_with(RECORD_KEY_PREFIX))
            .map(|(_, record)| record)
            .filter(|record| record.page_url == *page_url)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.captured_at_ms.cmp(&a.captured_at_ms));
        Ok(matching)
    }

    async fn set_hidden(
        &self,
        page_url: &PageUrl,
        css_locator: &str,
        hidden: bool,
    ) -> StoreResult<bool> {
        let mut records = self.records.write();
        let Some((key, old)) = Self::find_first(&records, page_url, css_locator) else {
            return Ok(false);
        };

        let mut updated = old.clone();
        updated.element.is_hidden = hidden;

        let mut next = records.clone();
        next.insert(key, updated.clone());
        self.flush(&next)?;
        *records = next;
        drop(records);

        debug!(record = %updated.record_id, hidden, "annotation visibility updated");
        self.notify(StoreChange {
            record_id: updated.record_id.clone(),
            old: Some(old),
            new: Some(updated),
        });
        Ok(true)
    }

    async fn remove(&self, page_url: &PageUrl, css_locator: &str) -> StoreResult<bool> {
        let mut records = self.records.write();
        let Some((key, old)) = Self::find_first(&records, page_url, css_locator) else {
            return Ok(false);
        };

        let mut next = records.clone();
        next.remove(&key);
        self.flush(&next)?;
        *records = next;
        drop(records);

        debug!(record = %old.record_id, page = %old.page_url, "annotation record removed");
        self.notify(StoreChange {
            record_id: old.record_id.clone(),
            old: Some(old),
            new: None,
        });
        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagehush_core_types::{CapturedElement, LocatorSet};
    use std::collections::BTreeMap as AttrMap;

    fn url(raw: &str) -> PageUrl {
        PageUrl::parse(raw).unwrap()
    }

    fn record(page: &str, css: &str, captured_at_ms: i64) -> AnnotationRecord {
        AnnotationRecord {
            record_id: RecordId::new(),
            element: CapturedElement {
                tag_name: "div".into(),
                id: None,
                class_name: None,
                text_preview: None,
                attributes: AttrMap::new(),
                selectors: LocatorSet {
                    css: css.into(),
                    xpath: format!("/body/{css}"),
                    tag_class: None,
                    attribute: None,
                },
                is_hidden: true,
            },
            page_url: url(page),
            captured_at_ms,
        }
    }

    #[tokio::test]
    async fn list_is_per_page_and_newest_first() {
        let store = MemoryAnnotationStore::new();
        store
            .upsert_new(record("https://a.example/", "#one", 100))
            .await
            .unwrap();
        store
            .upsert_new(record("https://a.example/", "#two", 300))
            .await
            .unwrap();
        store
            .upsert_new(record("https://b.example/", "#other", 200))
            .await
            .unwrap();

        let listed = store.list_by_page(&url("https://a.example/")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].element.selectors.css, "#two");
        assert_eq!(listed[1].element.selectors.css, "#one");
    }

    #[tokio::test]
    async fn page_identity_is_exact_including_query() {
        let store = MemoryAnnotationStore::new();
        store
            .upsert_new(record("https://a.example/?tab=1", "#x", 1))
            .await
            .unwrap();
        assert!(store
            .list_by_page(&url("https://a.example/?tab=2"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn identical_selectors_may_coexist() {
        let store = MemoryAnnotationStore::new();
        store
            .upsert_new(record("https://a.example/", "#dup", 1))
            .await
            .unwrap();
        store
            .upsert_new(record("https://a.example/", "#dup", 2))
            .await
            .unwrap();
        assert_eq!(
            store
                .list_by_page(&url("https://a.example/"))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn duplicate_record_id_is_rejected() {
        let store = MemoryAnnotationStore::new();
        let first = record("https://a.example/", "#x", 1);
        let mut second = record("https://a.example/", "#y", 2);
        second.record_id = first.record_id.clone();

        store.upsert_new(first).await.unwrap();
        let err = store.upsert_new(second).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::DuplicateRecord(_)));
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn set_hidden_touches_only_the_first_match() {
        let store = MemoryAnnotationStore::new();
        store
            .upsert_new(record("https://a.example/", "#dup", 1))
            .await
            .unwrap();
        store
            .upsert_new(record("https://a.example/", "#dup", 2))
            .await
            .unwrap();

        assert!(store
            .set_hidden(&url("https://a.example/"), "#dup", false)
            .await
            .unwrap());

        let listed = store.list_by_page(&url("https://a.example/")).await.unwrap();
        let hidden_flags: Vec<bool> = listed.iter().map(|r| r.element.is_hidden).collect();
        assert_eq!(hidden_flags.iter().filter(|h| !**h).count(), 1);
        assert_eq!(hidden_flags.iter().filter(|h| **h).count(), 1);
    }

    #[tokio::test]
    async fn set_hidden_and_remove_report_missing_matches() {
        let store = MemoryAnnotationStore::new();
        assert!(!store
            .set_hidden(&url("https://a.example/"), "#nope", true)
            .await
            .unwrap());
        assert!(!store.remove(&url("https://a.example/"), "#nope").await.unwrap());
    }

    #[tokio::test]
    async fn change_feed_distinguishes_add_mutate_remove() {
        let store = MemoryAnnotationStore::new();
        let mut feed = store.subscribe();

        store
            .upsert_new(record("https://a.example/", "#x", 1))
            .await
            .unwrap();
        let added = feed.recv().await.unwrap();
        assert!(added.is_addition());

        store
            .set_hidden(&url("https://a.example/"), "#x", false)
            .await
            .unwrap();
        let mutated = feed.recv().await.unwrap();
        assert!(mutated.is_mutation());
        assert!(mutated.old.as_ref().unwrap().element.is_hidden);
        assert!(!mutated.new.as_ref().unwrap().element.is_hidden);

        store.remove(&url("https://a.example/"), "#x").await.unwrap();
        let removed = feed.recv().await.unwrap();
        assert!(removed.is_removal());
    }

    #[tokio::test]
    async fn records_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");

        let store = MemoryAnnotationStore::with_persistence(&path).unwrap();
        store
            .upsert_new(record("https://a.example/", "#x", 1))
            .await
            .unwrap();
        drop(store);

        let reopened = MemoryAnnotationStore::with_persistence(&path).unwrap();
        let listed = reopened
            .list_by_page(&url("https://a.example/"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].element.selectors.css, "#x");
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_and_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-subdir").join("annotations.json");

        let store = MemoryAnnotationStore::with_persistence(&path).unwrap();
        let err = store
            .upsert_new(record("https://a.example/", "#x", 1))
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::Persistence(_)));
        assert_eq!(store.record_count(), 0);
        assert!(store
            .list_by_page(&url("https://a.example/"))
            .await
            .unwrap()
            .is_empty());
    }
}
