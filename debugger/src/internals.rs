//! The session state owner.
//!
//! All mutations of [`SessionState`] funnel through this type, called
//! from the processor task and the facade's frame selection. Derived
//! topics (`debugger:paused`, `debugger:resumed`, `debugger:script:parsed`,
//! `debugger:console`) are republished on the router *after* the state
//! update, so external subscribers always observe post-transition state.

use std::collections::HashMap;
use std::sync::Mutex;

use router::Router;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::events::{PausedEventBody, ProtocolEvent};
use crate::session::SessionEvent;
use crate::state::{ExecutionState, SessionState};
use crate::types::{Breakpoint, CallFrame, ConsoleMessage, FrameView, PausedView, Script};

/// Work order for frame enrichment, produced by a pause or a frame
/// selection and executed outside the state lock.
pub(crate) struct EnrichmentRequest {
    pub(crate) generation: u64,
    pub(crate) frame: CallFrame,
}

pub(crate) struct SessionInternals {
    state: Mutex<SessionState>,
    breakpoints: Mutex<HashMap<String, Breakpoint>>,
    router: Router<Value>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionInternals {
    pub(crate) fn new(router: Router<Value>, event_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            breakpoints: Mutex::new(HashMap::new()),
            router,
            event_tx,
        }
    }

    pub(crate) fn on_open(&self) {
        self.state.lock().unwrap().on_open();
        let _ = self.event_tx.send(SessionEvent::Running);
    }

    pub(crate) fn on_disconnect(&self) {
        self.state.lock().unwrap().on_disconnect();
        let _ = self.event_tx.send(SessionEvent::Disconnected);
    }

    /// Apply a classified event to the session state.
    ///
    /// Returns an [`EnrichmentRequest`] when a pause selected a frame
    /// whose script is registered; the caller runs the enrichment
    /// without holding any state lock.
    #[tracing::instrument(skip(self, event))]
    pub(crate) fn handle_event(&self, event: ProtocolEvent) -> Option<EnrichmentRequest> {
        match event {
            ProtocolEvent::Paused(body) => self.on_paused(body),
            ProtocolEvent::Resumed => {
                self.on_resumed();
                None
            }
            ProtocolEvent::ScriptParsed(script) => {
                self.on_script_parsed(script);
                None
            }
            ProtocolEvent::Console(message) => {
                self.on_console(message);
                None
            }
            ProtocolEvent::Unrecognised { method, .. } => {
                tracing::debug!(method, "unhandled event");
                None
            }
        }
    }

    fn on_paused(&self, body: PausedEventBody) -> Option<EnrichmentRequest> {
        let (view, request) = {
            let mut state = self.state.lock().unwrap();
            let generation = state.on_paused(body.call_frames)?;

            let view = PausedView {
                call_frames: state.call_frames().to_vec(),
                selected_frame: state.selected_frame(),
                reason: body.reason,
                hit_breakpoints: body.hit_breakpoints,
            };

            // scope resolution only runs for frames whose script we know
            let request = state.selected().and_then(|frame| {
                state
                    .script(&frame.location.script_id)
                    .is_some()
                    .then(|| EnrichmentRequest {
                        generation,
                        frame: frame.clone(),
                    })
            });
            (view, request)
        };

        self.router.publish(
            "debugger:paused",
            &serde_json::to_value(&view).unwrap_or(Value::Null),
        );
        let _ = self.event_tx.send(SessionEvent::Paused(view));
        request
    }

    fn on_resumed(&self) {
        self.state.lock().unwrap().on_resumed();
        self.router.publish("debugger:resumed", &Value::Null);
        let _ = self.event_tx.send(SessionEvent::Running);
    }

    fn on_script_parsed(&self, script: Script) {
        let grew = self.state.lock().unwrap().on_script_parsed(script.clone());
        if !grew {
            return;
        }
        self.router.publish(
            "debugger:script:parsed",
            &serde_json::to_value(&script).unwrap_or(Value::Null),
        );
        let _ = self.event_tx.send(SessionEvent::ScriptParsed(script));
    }

    fn on_console(&self, message: ConsoleMessage) {
        self.router.publish(
            "debugger:console",
            &serde_json::to_value(&message).unwrap_or(Value::Null),
        );
        let _ = self.event_tx.send(SessionEvent::Console(message));
    }

    /// Select a different frame of the current pause; fails while not
    /// paused or out of range.
    pub(crate) fn select_frame(&self, index: usize) -> eyre::Result<EnrichmentRequest> {
        let mut state = self.state.lock().unwrap();
        let frame = state.select_frame(index)?.clone();
        Ok(EnrichmentRequest {
            generation: state.pause_generation(),
            frame,
        })
    }

    /// Hand a completed frame view to the render sink, unless the pause
    /// it was computed for is no longer current.
    pub(crate) fn commit_frame_view(&self, generation: u64, view: FrameView) -> bool {
        {
            let state = self.state.lock().unwrap();
            if state.execution() != ExecutionState::Paused
                || state.pause_generation() != generation
            {
                tracing::debug!(generation, "discarding stale frame enrichment");
                return false;
            }
        }
        let _ = self.event_tx.send(SessionEvent::FrameRendered(view));
        true
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }

    pub(crate) fn record_breakpoint(&self, breakpoint: Breakpoint) {
        self.breakpoints
            .lock()
            .unwrap()
            .insert(breakpoint.id.clone(), breakpoint);
    }

    pub(crate) fn forget_breakpoint(&self, id: &str) -> eyre::Result<Breakpoint> {
        self.breakpoints
            .lock()
            .unwrap()
            .remove(id)
            .ok_or_else(|| eyre::eyre!("unknown breakpoint {id}"))
    }

    pub(crate) fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.lock().unwrap().values().cloned().collect()
    }
}
