//! The per-page injected context.
//!
//! Owns the pick session and the visibility applier for one loaded page,
//! serves bridge commands, and on every fresh load re-applies the stored
//! hides for the page's exact URL.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use dom_adapter::PageHandle;
use pagehush_annotation_store::AnnotationStore;
use pagehush_core_types::{AnnotationRecord, PageUrl, TabId};
use pick_session::{Captured, HoverInspector, PickSession};
use visibility_applier::{RetryCfg, RetryHandle, RetryOutcome, VisibilityApplier};

use crate::message::{CommandAck, ElementCaptured, PageCommand};
use crate::router::CommandRouter;

const CAPTURE_QUEUE_DEPTH: usize = 8;

pub struct InjectedContext {
    tab: TabId,
    page_url: PageUrl,
    store: Arc<dyn AnnotationStore>,
    applier: VisibilityApplier,
    session: Arc<PickSession>,
    router: Arc<CommandRouter>,
    restore_tasks: Mutex<Vec<RetryHandle>>,
    worker_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl InjectedContext {
    /// Wire a freshly loaded page into the bridge: register its command
    /// channel, start the capture pipeline, and kick off the re-hide pass
    /// for annotations stored against this exact URL.
    pub async fn attach(
        tab: TabId,
        page_url: PageUrl,
        page: PageHandle,
        inspector: Arc<dyn HoverInspector>,
        store: Arc<dyn AnnotationStore>,
        router: Arc<CommandRouter>,
        retry: RetryCfg,
    ) -> Arc<Self> {
        let (captured_tx, mut captured_rx) = mpsc::channel(CAPTURE_QUEUE_DEPTH);
        let session = PickSession::new(inspector, page.clone(), captured_tx);
        let applier = VisibilityApplier::with_retry_cfg(page, retry);

        let ctx = Arc::new(Self {
            tab,
            page_url,
            store,
            applier,
            session,
            router: Arc::clone(&router),
            restore_tasks: Mutex::new(Vec::new()),
            worker_tasks: Mutex::new(Vec::new()),
        });

        let mut commands = router.register_page(tab);
        let command_ctx = Arc::clone(&ctx);
        let command_loop = tokio::spawn(async move {
            while let Some(envelope) = commands.recv().await {
                let ack = command_ctx.handle_command(envelope.command).await;
                let _ = envelope.reply.send(ack);
            }
        });

        let capture_ctx = Arc::clone(&ctx);
        let capture_loop = tokio::spawn(async move {
            while let Some(captured) = captured_rx.recv().await {
                capture_ctx.on_captured(captured).await;
            }
        });

        ctx.worker_tasks.lock().extend([command_loop, capture_loop]);
        ctx.restore_hidden().await;
        ctx
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn page_url(&self) -> &PageUrl {
        &self.page_url
    }

    pub fn is_picking(&self) -> bool {
        self.session.is_active()
    }

    async fn restore_hidden(&self) {
        match self.store.list_by_page(&self.page_url).await {
            Ok(records) => {
                let mut tasks = self.restore_tasks.lock();
                for record in records.into_iter().filter(|r| r.element.is_hidden) {
                    debug!(
                        page = %self.page_url,
                        selector = %record.element.selectors.css,
                        "re-applying stored hide"
                    );
                    tasks.push(
                        self.applier
                            .apply_with_retry(record.element.selectors.css.clone()),
                    );
                }
            }
            Err(err) => error!(
                page = %self.page_url,
                error = %err,
                "failed to list stored annotations on load"
            ),
        }
    }

    pub async fn handle_command(&self, command: PageCommand) -> CommandAck {
        match command {
            PageCommand::StartPicking => match self.session.start() {
                Ok(()) => CommandAck::ok(),
                Err(err) => {
                    error!(page = %self.page_url, error = %err, "failed to start picking");
                    CommandAck::failed()
                }
            },
            PageCommand::StopPicking => {
                self.session.stop();
                CommandAck::ok()
            }
            PageCommand::SetVisibility {
                css_locator,
                hidden,
            } => {
                let matched = self.applier.apply(&css_locator, hidden).await;
                CommandAck {
                    success: matched > 0,
                }
            }
        }
    }

    /// A pick finished: hide the element right away, persist the record,
    /// then tell the background about it. The hide comes first so the user
    /// sees the effect even if persistence fails.
    async fn on_captured(&self, captured: Captured) {
        let css = captured.element.selectors.css.clone();
        self.applier.apply(&css, true).await;

        let record = AnnotationRecord::created_now(
            captured.record_id,
            self.page_url.clone(),
            captured.element,
        );
        match self.store.upsert_new(record.clone()).await {
            Ok(record_id) => {
                self.router.publish_captured(ElementCaptured {
                    tab: self.tab,
                    page_url: self.page_url.clone(),
                    record_id,
                    element: record.element,
                });
            }
            Err(err) => error!(
                page = %self.page_url,
                selector = %css,
                error = %err,
                "failed to persist captured element"
            ),
        }
    }

    /// Drain the re-hide tasks and wait for their terminal outcomes.
    pub async fn await_restore(&self) -> Vec<(String, Option<RetryOutcome>)> {
        let handles: Vec<RetryHandle> = self.restore_tasks.lock().drain(..).collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let css = handle.css_locator().to_string();
            outcomes.push((css, handle.outcome().await));
        }
        outcomes
    }

    /// Tear the context down, as navigating away would.
    pub fn detach(&self) {
        for task in self.worker_tasks.lock().drain(..) {
            task.abort();
        }
        for handle in self.restore_tasks.lock().drain(..) {
            handle.abort();
        }
        self.session.stop();
        self.router.unregister_page(self.tab);
    }
}
