//! Host-runtime surfaces the bridge drives, kept behind ports. The
//! in-memory implementations back tests and the CLI host.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pagehush_core_types::{PageUrl, TabId};

/// Identity of one completion notification. Every pick gets its own.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-tab action badge.
#[async_trait]
pub trait BadgeSurface: Send + Sync {
    async fn set_badge(&self, tab: TabId, text: &str, color: &str);
    async fn clear_badge(&self, tab: TabId);
}

/// What a completion notification shows.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NotificationView {
    pub title: String,
    pub body: String,
    pub action: String,
}

/// Dismissable user notifications.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    async fn show(&self, id: &NotificationId, view: NotificationView);
    async fn clear(&self, id: &NotificationId);
}

/// Resolves the tab the user is currently looking at.
#[async_trait]
pub trait TabQuery: Send + Sync {
    async fn active_tab(&self) -> Option<(TabId, PageUrl)>;
}

/// In-memory badge surface recording the current badge per tab.
#[derive(Default)]
pub struct MemoryBadgeSurface {
    badges: DashMap<TabId, (String, String)>,
}

impl MemoryBadgeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn badge_text(&self, tab: TabId) -> Option<String> {
        self.badges.get(&tab).map(|entry| entry.value().0.clone())
    }
}

#[async_trait]
impl BadgeSurface for MemoryBadgeSurface {
    async fn set_badge(&self, tab: TabId, text: &str, color: &str) {
        self.badges.insert(tab, (text.to_string(), color.to_string()));
    }

    async fn clear_badge(&self, tab: TabId) {
        self.badges.remove(&tab);
    }
}

/// In-memory notification surface tracking which notifications are live.
#[derive(Default)]
pub struct MemoryNotificationSurface {
    live: DashMap<NotificationId, NotificationView>,
}

impl MemoryNotificationSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, id: &NotificationId) -> bool {
        self.live.contains_key(id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_ids(&self) -> Vec<NotificationId> {
        self.live.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl NotificationSurface for MemoryNotificationSurface {
    async fn show(&self, id: &NotificationId, view: NotificationView) {
        self.live.insert(id.clone(), view);
    }

    async fn clear(&self, id: &NotificationId) {
        self.live.remove(id);
    }
}

/// Tab query pinned to one tab, the common case for a single-page host.
pub struct FixedTabQuery {
    tab: TabId,
    url: PageUrl,
}

impl FixedTabQuery {
    pub fn new(tab: TabId, url: PageUrl) -> Self {
        Self { tab, url }
    }
}

#[async_trait]
impl TabQuery for FixedTabQuery {
    async fn active_tab(&self) -> Option<(TabId, PageUrl)> {
        Some((self.tab, self.url.clone()))
    }
}
