//! Typed cross-context messages.

use serde::{Deserialize, Serialize};

use pagehush_core_types::{CapturedElement, PageUrl, RecordId, TabId};

/// Commands a page's injected context serves. Each gets exactly one ack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PageCommand {
    StartPicking,
    StopPicking,
    SetVisibility { css_locator: String, hidden: bool },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub success: bool,
}

impl CommandAck {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Fire-and-forget signal published after a pick has been persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementCaptured {
    pub tab: TabId,
    pub page_url: PageUrl,
    pub record_id: RecordId,
    pub element: CapturedElement,
}
