//! The hover/highlight inspector port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use dom_adapter::NodeId;

use crate::errors::PickError;

/// Targets that must never be offered for picking: the panel's own injected
/// markup plus raw document scaffolding.
pub const PICK_EXCLUDES: [&str; 4] = ["[data-pagehush-overlay]", "script", "style", "head"];

const EVENT_QUEUE_DEPTH: usize = 8;

/// Options the inspector is engaged with.
#[derive(Clone, Debug)]
pub struct InspectOptions {
    /// Selectors the hover predicate rejects outright.
    pub excludes: Vec<String>,
    /// Swallow clicks so the underlying page never reacts to them.
    pub block_navigation: bool,
}

impl InspectOptions {
    pub fn standard() -> Self {
        Self {
            excludes: PICK_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            block_navigation: true,
        }
    }
}

/// A pointer click as the inspector saw it. Consuming it (prevent default +
/// stop propagation) keeps the underlying page from reacting.
#[derive(Clone, Debug, Default)]
pub struct ClickEvent {
    default_prevented: Arc<AtomicBool>,
    propagation_stopped: Arc<AtomicBool>,
}

impl ClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.store(true, Ordering::SeqCst);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::SeqCst)
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.load(Ordering::SeqCst)
    }
}

/// Raw signals delivered while the inspector is engaged.
#[derive(Clone, Debug)]
pub enum InspectorEvent {
    Clicked { node: NodeId, click: ClickEvent },
    EscapePressed,
}

/// Opaque hover-highlight capability: given the engage options, it offers
/// candidate nodes under the cursor and reports clicks and the escape key.
pub trait HoverInspector: Send + Sync {
    /// Start highlighting; events arrive on the returned receiver until the
    /// inspector is disengaged.
    fn engage(&self, options: InspectOptions) -> Result<mpsc::Receiver<InspectorEvent>, PickError>;

    /// Tear the overlay down. `reset_overlay` also clears leftover
    /// inspector styling.
    fn disengage(&self, reset_overlay: bool);
}

/// In-process inspector used by tests and the CLI host: callers script the
/// clicks and escapes a real overlay would produce.
pub struct ChannelInspector {
    sender: Mutex<Option<mpsc::Sender<InspectorEvent>>>,
    engaged_options: Mutex<Option<InspectOptions>>,
}

impl ChannelInspector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sender: Mutex::new(None),
            engaged_options: Mutex::new(None),
        })
    }

    pub fn is_engaged(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub fn options(&self) -> Option<InspectOptions> {
        self.engaged_options.lock().clone()
    }

    /// Script a click on `node`; returns the event so callers can observe
    /// whether it was consumed. `None` when the inspector is not engaged.
    pub fn emit_click(&self, node: NodeId) -> Option<ClickEvent> {
        let guard = self.sender.lock();
        let sender = guard.as_ref()?;
        let click = ClickEvent::new();
        sender
            .try_send(InspectorEvent::Clicked {
                node,
                click: click.clone(),
            })
            .ok()?;
        Some(click)
    }

    pub fn emit_escape(&self) -> bool {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(sender) => sender.try_send(InspectorEvent::EscapePressed).is_ok(),
            None => false,
        }
    }
}

impl HoverInspector for ChannelInspector {
    fn engage(&self, options: InspectOptions) -> Result<mpsc::Receiver<InspectorEvent>, PickError> {
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return Err(PickError::AlreadyEngaged);
        }
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        *sender = Some(tx);
        *self.engaged_options.lock() = Some(options);
        Ok(rx)
    }

    fn disengage(&self, _reset_overlay: bool) {
        self.sender.lock().take();
        self.engaged_options.lock().take();
    }
}
