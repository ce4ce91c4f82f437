//! Shared state for the comms channels: capability boundary.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below. The plugin itself is private; channels cannot reach the
//! tracker or the LLM provider directly.
//!
//! # Intra-subsystem events
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! manager (e.g. "I shut down") without a direct handle to it. The manager
//! owns the receiver end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::supervision::{MessageEvent, Response, SupervisorPlugin};

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// Channel is connected and receiving messages.
    ChannelReady { channel_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    plugin: Arc<SupervisorPlugin>,
    /// Back-channel to the comms manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(plugin: Arc<SupervisorPlugin>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { plugin, event_tx }
    }

    /// Run one incoming message through the plugin; `None` means stay quiet.
    pub async fn dispatch<E: MessageEvent + ?Sized>(&self, event: &E) -> Option<Response> {
        self.plugin.handle(event).await
    }

    /// Report an event to the comms manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
