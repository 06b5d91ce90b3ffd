//! Per-tab command routing and the capture broadcast feed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use pagehush_core_types::TabId;

use crate::errors::BridgeError;
use crate::message::{CommandAck, ElementCaptured, PageCommand};

const COMMAND_QUEUE_DEPTH: usize = 8;
const CAPTURED_FEED_DEPTH: usize = 32;

/// A command in flight to one page context, with its reply slot.
pub struct CommandEnvelope {
    pub command: PageCommand,
    pub reply: oneshot::Sender<CommandAck>,
}

/// Connects the contexts: point-to-point commands to whichever page context
/// is registered for a tab, and a broadcast feed for capture signals.
pub struct CommandRouter {
    channels: DashMap<TabId, mpsc::Sender<CommandEnvelope>>,
    captured: broadcast::Sender<ElementCaptured>,
}

impl CommandRouter {
    pub fn new() -> Arc<Self> {
        let (captured, _) = broadcast::channel(CAPTURED_FEED_DEPTH);
        Arc::new(Self {
            channels: DashMap::new(),
            captured,
        })
    }

    /// Register the page context serving `tab`. A reload registers a fresh
    /// channel and silently replaces the stale one.
    pub fn register_page(&self, tab: TabId) -> mpsc::Receiver<CommandEnvelope> {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        self.channels.insert(tab, tx);
        debug!(%tab, "page context registered");
        rx
    }

    pub fn unregister_page(&self, tab: TabId) {
        self.channels.remove(&tab);
        debug!(%tab, "page context unregistered");
    }

    /// Send one command and wait for its ack. A tab with no live page
    /// context is a failed command, never a crash.
    pub async fn send_command(
        &self,
        tab: TabId,
        command: PageCommand,
    ) -> Result<CommandAck, BridgeError> {
        let sender = self
            .channels
            .get(&tab)
            .map(|entry| entry.value().clone())
            .ok_or(BridgeError::ContextUnreachable(tab))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(CommandEnvelope {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::ChannelClosed(tab))?;
        reply_rx.await.map_err(|_| BridgeError::ChannelClosed(tab))
    }

    pub fn publish_captured(&self, signal: ElementCaptured) {
        // nobody listening is fine; the feed only serves live contexts
        let _ = self.captured.send(signal);
    }

    pub fn subscribe_captured(&self) -> broadcast::Receiver<ElementCaptured> {
        self.captured.subscribe()
    }
}
