//! The in-process runtime: one page, one store, all three contexts wired
//! through the bridge, with the host surfaces backed by the in-memory
//! implementations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::info;

use pagehush_annotation_store::{AnnotationStore, MemoryAnnotationStore};
use dom_adapter::{PageHandle, PageHost};
use pagehush_core_types::{AnnotationRecord, PageUrl, TabId};
use pick_session::ChannelInspector;
use sync_bridge::{
    BackgroundContext, CommandRouter, FixedTabQuery, InjectedContext, MemoryBadgeSurface,
    MemoryNotificationSurface, PageCommand, PanelContext,
};

use crate::config::AppCfg;

const PICK_WAIT_BUDGET: Duration = Duration::from_secs(5);

/// The tab a single-page host serves.
pub const HOST_TAB: TabId = TabId(1);

pub struct AppRuntime {
    pub page: PageHandle,
    pub inspector: Arc<ChannelInspector>,
    pub store: Arc<MemoryAnnotationStore>,
    pub router: Arc<CommandRouter>,
    pub badge: Arc<MemoryBadgeSurface>,
    pub notifier: Arc<MemoryNotificationSurface>,
    pub background: Arc<BackgroundContext>,
    pub injected: Arc<InjectedContext>,
    pub page_url: PageUrl,
}

impl AppRuntime {
    /// Bring the whole rig up over one page: parse the document, wire the
    /// contexts, and run the load-time re-hide pass.
    pub async fn launch(
        html: &str,
        page_url: PageUrl,
        store: Arc<MemoryAnnotationStore>,
        cfg: &AppCfg,
    ) -> anyhow::Result<Self> {
        let page = PageHost::launch(html).context("failed to launch page host")?;
        let inspector = ChannelInspector::new();
        let router = CommandRouter::new();
        let badge = Arc::new(MemoryBadgeSurface::new());
        let notifier = Arc::new(MemoryNotificationSurface::new());
        let background = BackgroundContext::spawn(
            &router,
            badge.clone(),
            notifier.clone(),
            cfg.notify.clone(),
        );

        let store_dyn: Arc<dyn AnnotationStore> = store.clone();
        let injected = InjectedContext::attach(
            HOST_TAB,
            page_url.clone(),
            page.clone(),
            inspector.clone(),
            store_dyn,
            Arc::clone(&router),
            cfg.retry.clone(),
        )
        .await;

        info!(page = %page_url, "runtime up");
        Ok(Self {
            page,
            inspector,
            store,
            router,
            badge,
            notifier,
            background,
            injected,
            page_url,
        })
    }

    /// Open the user panel over this runtime's tab.
    pub async fn open_panel(&self) -> anyhow::Result<PanelContext> {
        let tabs = FixedTabQuery::new(HOST_TAB, self.page_url.clone());
        let store_dyn: Arc<dyn AnnotationStore> = self.store.clone();
        PanelContext::open(&tabs, store_dyn, Arc::clone(&self.router), &self.background)
            .await
            .context("failed to open panel")
    }

    /// Drive a full pick of the first element matching `target_css`, as the
    /// hover inspector would after a user click, and return the persisted
    /// record.
    pub async fn simulate_pick(&self, target_css: &str) -> anyhow::Result<AnnotationRecord> {
        let before = self.store.record_count();

        let ack = self
            .router
            .send_command(HOST_TAB, PageCommand::StartPicking)
            .await?;
        if !ack.success {
            return Err(anyhow!("page context refused to start picking"));
        }

        let node = self
            .page
            .first_match(target_css)
            .await?
            .ok_or_else(|| anyhow!("no element matches {target_css}"))?;
        self.inspector
            .emit_click(node)
            .ok_or_else(|| anyhow!("inspector is not engaged"))?;

        let waited = tokio::time::timeout(PICK_WAIT_BUDGET, async {
            while self.store.record_count() <= before {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        if waited.is_err() {
            return Err(anyhow!("pick of {target_css} was never persisted"));
        }

        let records = self.store.list_by_page(&self.page_url).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("picked record vanished"))
    }

    pub fn shutdown(&self) {
        self.injected.detach();
        self.background.shutdown();
    }
}
