//! The persistent background context.
//!
//! Listens for capture signals and raises the transient completion
//! indicator: a per-tab badge plus one dismissable notification per pick.
//! Every notification owns its own auto-clear timer; the badge for a tab
//! stays up while any of its notifications is still pending, so clearing
//! one pick's indicator never wipes out another's.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use pagehush_core_types::TabId;

use crate::ports::{BadgeSurface, NotificationId, NotificationSurface, NotificationView};
use crate::router::CommandRouter;

pub const BADGE_TEXT: &str = "\u{2713}";
pub const BADGE_COLOR: &str = "#4CAF50";

/// Lifetime of an undismissed completion indicator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifyCfg {
    pub auto_clear_ms: u64,
}

impl NotifyCfg {
    pub fn auto_clear(&self) -> Duration {
        Duration::from_millis(self.auto_clear_ms)
    }
}

impl Default for NotifyCfg {
    fn default() -> Self {
        Self {
            auto_clear_ms: 5_000,
        }
    }
}

struct PendingCompletion {
    tab: TabId,
    timer: JoinHandle<()>,
}

pub struct BackgroundContext {
    badge: Arc<dyn BadgeSurface>,
    notifier: Arc<dyn NotificationSurface>,
    cfg: NotifyCfg,
    pending: Mutex<HashMap<NotificationId, PendingCompletion>>,
    feed_task: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundContext {
    /// Start the background context on the router's capture feed.
    pub fn spawn(
        router: &CommandRouter,
        badge: Arc<dyn BadgeSurface>,
        notifier: Arc<dyn NotificationSurface>,
        cfg: NotifyCfg,
    ) -> Arc<Self> {
        let ctx = Arc::new(Self {
            badge,
            notifier,
            cfg,
            pending: Mutex::new(HashMap::new()),
            feed_task: Mutex::new(None),
        });

        let mut signals = router.subscribe_captured();
        let feed_ctx = Arc::clone(&ctx);
        let task = tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => {
                        feed_ctx.on_captured(signal.tab).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "capture feed lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *ctx.feed_task.lock() = Some(task);
        ctx
    }

    /// Raise the completion indicator for one finished pick. Each call
    /// creates an independent notification with its own auto-clear timer.
    pub async fn on_captured(self: &Arc<Self>, tab: TabId) -> NotificationId {
        self.badge.set_badge(tab, BADGE_TEXT, BADGE_COLOR).await;

        let id = NotificationId::new();
        self.notifier.show(&id, completion_notification()).await;

        let timer = {
            let ctx = Arc::clone(self);
            let timer_id = id.clone();
            tokio::spawn(async move {
                sleep(ctx.cfg.auto_clear()).await;
                ctx.clear_completion(&timer_id, false).await;
            })
        };

        self.pending
            .lock()
            .insert(id.clone(), PendingCompletion { tab, timer });
        debug!(%tab, "completion indicator raised");
        id
    }

    /// The user clicked the notification body or its action button.
    pub async fn dismiss(&self, id: &NotificationId) {
        self.clear_completion(id, true).await;
    }

    /// Opening the panel for a tab acknowledges everything pending there.
    pub async fn panel_opened(&self, tab: TabId) {
        let ids: Vec<NotificationId> = self
            .pending
            .lock()
            .iter()
            .filter(|(_, pending)| pending.tab == tab)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            self.clear_completion(&id, true).await;
        }
    }

    /// Clear one indicator. `cancel_timer` is false when the call comes
    /// from the timer itself, which must not abort its own task.
    async fn clear_completion(&self, id: &NotificationId, cancel_timer: bool) {
        let Some(pending) = self.pending.lock().remove(id) else {
            return;
        };
        if cancel_timer {
            pending.timer.abort();
        }
        self.notifier.clear(id).await;

        let tab_still_pending = self
            .pending
            .lock()
            .values()
            .any(|other| other.tab == pending.tab);
        if !tab_still_pending {
            self.badge.clear_badge(pending.tab).await;
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn shutdown(&self) {
        if let Some(task) = self.feed_task.lock().take() {
            task.abort();
        }
        for (_, pending) in self.pending.lock().drain() {
            pending.timer.abort();
        }
    }
}

fn completion_notification() -> NotificationView {
    NotificationView {
        title: "Element picked".to_string(),
        body: "Open the pagehush panel to review the picked element".to_string(),
        action: "View".to_string(),
    }
}
