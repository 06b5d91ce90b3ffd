//! The ephemeral panel context.
//!
//! Nothing survives a close: every open re-reads the active tab and the
//! store. The live feed appends only additions for the panel's page;
//! mutations are already reflected by whichever direct action caused them.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use pagehush_annotation_store::AnnotationStore;
use pagehush_core_types::{AnnotationRecord, PageUrl, TabId};

use crate::background::BackgroundContext;
use crate::errors::BridgeError;
use crate::message::{CommandAck, PageCommand};
use crate::ports::TabQuery;
use crate::router::CommandRouter;

pub struct PanelContext {
    tab: TabId,
    page_url: PageUrl,
    store: Arc<dyn AnnotationStore>,
    router: Arc<CommandRouter>,
    records: Arc<RwLock<Vec<AnnotationRecord>>>,
    feed_task: JoinHandle<()>,
}

impl PanelContext {
    /// Open the panel over the currently active tab. Acknowledges that
    /// tab's pending completion indicators, lists the stored records for
    /// the exact URL, and follows the store's change feed from here on.
    pub async fn open(
        tabs: &dyn TabQuery,
        store: Arc<dyn AnnotationStore>,
        router: Arc<CommandRouter>,
        background: &Arc<BackgroundContext>,
    ) -> Result<Self, BridgeError> {
        let (tab, page_url) = tabs.active_tab().await.ok_or(BridgeError::NoActiveTab)?;
        background.panel_opened(tab).await;

        let listed = store.list_by_page(&page_url).await?;
        let records = Arc::new(RwLock::new(listed));

        let mut changes = store.subscribe();
        let feed_records = Arc::clone(&records);
        let feed_url = page_url.clone();
        let feed_task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if !change.is_addition() {
                            continue;
                        }
                        if let Some(record) = change.new {
                            if record.page_url == feed_url {
                                // newest first, matching the listing order
                                feed_records.write().insert(0, record);
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "panel change feed lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Self {
            tab,
            page_url,
            store,
            router,
            records,
            feed_task,
        })
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn page_url(&self) -> &PageUrl {
        &self.page_url
    }

    /// Current render model, newest capture first.
    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.records.read().clone()
    }

    pub async fn start_picking(&self) -> Result<CommandAck, BridgeError> {
        self.router
            .send_command(self.tab, PageCommand::StartPicking)
            .await
    }

    pub async fn stop_picking(&self) -> Result<CommandAck, BridgeError> {
        self.router
            .send_command(self.tab, PageCommand::StopPicking)
            .await
    }

    /// Toggle one record's visibility: the live page first, then the
    /// store. Returns whether a stored record matched.
    pub async fn set_record_hidden(
        &self,
        css_locator: &str,
        hidden: bool,
    ) -> Result<bool, BridgeError> {
        self.router
            .send_command(
                self.tab,
                PageCommand::SetVisibility {
                    css_locator: css_locator.to_string(),
                    hidden,
                },
            )
            .await?;

        let found = self.store.set_hidden(&self.page_url, css_locator, hidden).await?;
        if found {
            let mut records = self.records.write();
            if let Some(record) = records
                .iter_mut()
                .find(|record| record.element.selectors.css == css_locator)
            {
                record.element.is_hidden = hidden;
            }
        }
        Ok(found)
    }

    /// Delete one record, restoring the element's visibility first so a
    /// later reload has nothing left to re-hide.
    pub async fn delete_record(&self, css_locator: &str) -> Result<bool, BridgeError> {
        self.router
            .send_command(
                self.tab,
                PageCommand::SetVisibility {
                    css_locator: css_locator.to_string(),
                    hidden: false,
                },
            )
            .await?;

        let removed = self.store.remove(&self.page_url, css_locator).await?;
        if removed {
            let mut records = self.records.write();
            if let Some(index) = records
                .iter()
                .position(|record| record.element.selectors.css == css_locator)
            {
                records.remove(index);
            }
        }
        Ok(removed)
    }

    /// Tear the panel down; its state does not outlive it.
    pub fn close(self) {
        self.feed_task.abort();
    }
}
