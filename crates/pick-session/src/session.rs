//! The picking state machine.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use dom_adapter::PageHandle;
use pagehush_core_types::{CapturedElement, RecordId};

use crate::capture::capture_element;
use crate::errors::PickError;
use crate::inspector::{HoverInspector, InspectOptions, InspectorEvent};

/// Emitted exactly once per successful pick. The record id is minted here
/// and follows the element through the store and every event about it.
#[derive(Clone, Debug)]
pub struct Captured {
    pub record_id: RecordId,
    pub element: CapturedElement,
}

enum SessionState {
    Idle,
    Active { pump: JoinHandle<()> },
}

/// Turns raw inspector events into at most one captured element per
/// engagement. State is owned here, per injected context; nothing about a
/// finished pick survives into the next one.
pub struct PickSession {
    inspector: Arc<dyn HoverInspector>,
    page: PageHandle,
    captured_tx: mpsc::Sender<Captured>,
    options: InspectOptions,
    state: Mutex<SessionState>,
}

impl PickSession {
    pub fn new(
        inspector: Arc<dyn HoverInspector>,
        page: PageHandle,
        captured_tx: mpsc::Sender<Captured>,
    ) -> Arc<Self> {
        Self::with_options(inspector, page, captured_tx, InspectOptions::standard())
    }

    pub fn with_options(
        inspector: Arc<dyn HoverInspector>,
        page: PageHandle,
        captured_tx: mpsc::Sender<Captured>,
        options: InspectOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            inspector,
            page,
            captured_tx,
            options,
            state: Mutex::new(SessionState::Idle),
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Active { .. })
    }

    /// Engage the inspector and wait for a click or escape. No-op when a
    /// session is already active.
    pub fn start(self: &Arc<Self>) -> Result<(), PickError> {
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Active { .. }) {
            debug!("pick session already active");
            return Ok(());
        }

        let events = self.inspector.engage(self.options.clone())?;
        let session = Arc::clone(self);
        let pump = tokio::spawn(session.pump(events));
        *state = SessionState::Active { pump };
        Ok(())
    }

    /// Disengage and return to idle. No-op when already idle.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let SessionState::Active { pump } = std::mem::replace(&mut *state, SessionState::Idle) {
            pump.abort();
            self.inspector.disengage(true);
        }
    }

    /// Idle transition from inside the pump, after a capture or escape.
    fn finish(&self) {
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Active { .. }) {
            *state = SessionState::Idle;
            self.inspector.disengage(true);
        }
    }

    async fn pump(self: Arc<Self>, mut events: mpsc::Receiver<InspectorEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                InspectorEvent::Clicked { node, click } => {
                    // the page must not react to the pick click
                    click.prevent_default();
                    click.stop_propagation();

                    let snapshot = self.page.with(move |page| capture_element(page, node)).await;
                    self.finish();

                    match snapshot {
                        Ok(Some(element)) => {
                            let captured = Captured {
                                record_id: RecordId::new(),
                                element,
                            };
                            if self.captured_tx.send(captured).await.is_err() {
                                warn!("captured-element receiver is gone");
                            }
                        }
                        Ok(None) => warn!("clicked node vanished before it could be captured"),
                        Err(err) => error!(error = %err, "failed to snapshot clicked node"),
                    }
                    break;
                }
                InspectorEvent::EscapePressed => {
                    debug!("pick cancelled via escape");
                    self.finish();
                    break;
                }
            }
        }
    }
}
