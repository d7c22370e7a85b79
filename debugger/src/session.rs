//! Session change notifications for external consumers.

use tokio::sync::mpsc;

use crate::types::{ConsoleMessage, FrameView, PausedView, Script};

/// A state change notification emitted by the session.
///
/// These are the render-sink payloads: complete view-models, decoupled
/// from raw protocol method names.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The target is running (connected, or resumed after a pause).
    Running,
    /// The target paused; frames are available but not yet enriched.
    Paused(PausedView),
    /// The selected frame's source preview and scope listing are ready.
    FrameRendered(FrameView),
    /// A new script entered the registry.
    ScriptParsed(Script),
    /// Console output from the target.
    Console(ConsoleMessage),
    /// The connection closed or errored.
    Disconnected,
}

/// Async receiver for session events.
pub struct SessionEventReceiver {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEventReceiver {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Wait for an event matching the predicate, discarding others.
    pub async fn wait_for<F>(&mut self, pred: F) -> Option<SessionEvent>
    where
        F: Fn(&SessionEvent) -> bool,
    {
        let mut n = 0;
        while let Some(event) = self.rx.recv().await {
            if pred(&event) {
                return Some(event);
            }
            tracing::trace!(event = ?event, "non-matching event");
            n += 1;
            if n >= 100 {
                panic!("did not receive expected event after 100 others");
            }
        }
        None
    }

    /// Convert to a Stream for use with StreamExt.
    pub fn into_stream(self) -> impl futures::Stream<Item = SessionEvent> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}
