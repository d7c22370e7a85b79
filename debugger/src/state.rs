//! The session state machine.
//!
//! All mutation happens through the handlers here, driven by classified
//! events; every other component only reads. In the async session the
//! mutations are serialized through a single owner (the processor task
//! plus the facade's frame selection, behind one lock), preserving the
//! single-writer invariant.

use std::collections::HashMap;

use crate::types::{CallFrame, Script, ScriptId};

/// Execution state of the debug target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// No live connection.
    Disconnected,
    /// Connected, not paused.
    Running,
    /// Paused with a call stack available.
    Paused,
}

/// Aggregate session state: script registry, pause state, call frames.
#[derive(Debug)]
pub struct SessionState {
    scripts: HashMap<ScriptId, Script>,
    execution: ExecutionState,
    call_frames: Vec<CallFrame>,
    selected_frame: usize,
    pause_generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            execution: ExecutionState::Disconnected,
            call_frames: Vec::new(),
            selected_frame: 0,
            pause_generation: 0,
        }
    }

    pub fn execution(&self) -> ExecutionState {
        self.execution
    }

    /// Call frames of the current pause, outermost-last as delivered.
    pub fn call_frames(&self) -> &[CallFrame] {
        &self.call_frames
    }

    pub fn selected_frame(&self) -> usize {
        self.selected_frame
    }

    /// The currently selected call frame, if paused.
    pub fn selected(&self) -> Option<&CallFrame> {
        self.call_frames.get(self.selected_frame)
    }

    /// Monotonic counter identifying the current pause; enrichment
    /// results computed for an older generation are stale.
    pub fn pause_generation(&self) -> u64 {
        self.pause_generation
    }

    pub fn script(&self, id: &str) -> Option<&Script> {
        self.scripts.get(id)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Script> {
        self.scripts.values()
    }

    /// Transport open: the target is running.
    pub fn on_open(&mut self) {
        self.execution = ExecutionState::Running;
    }

    /// Handle a pause event, replacing the call-frame sequence wholesale
    /// and selecting frame 0.
    ///
    /// Returns the new pause generation, or `None` when the event was
    /// ignored. A pause with an empty call-frame list leaves frames and
    /// the pause flag untouched; this matches an observed quirk in event
    /// shapes and is deliberately preserved.
    pub fn on_paused(&mut self, call_frames: Vec<CallFrame>) -> Option<u64> {
        if self.execution == ExecutionState::Disconnected {
            tracing::warn!("pause event while disconnected; ignoring");
            return None;
        }
        if call_frames.is_empty() {
            tracing::warn!("pause event with no call frames; ignoring");
            return None;
        }

        self.execution = ExecutionState::Paused;
        self.call_frames = call_frames;
        self.selected_frame = 0;
        self.pause_generation += 1;
        Some(self.pause_generation)
    }

    /// Handle a resume event: back to running, call frames cleared,
    /// selection reset.
    pub fn on_resumed(&mut self) {
        if self.execution == ExecutionState::Disconnected {
            tracing::warn!("resume event while disconnected; ignoring");
            return;
        }
        self.execution = ExecutionState::Running;
        self.call_frames.clear();
        self.selected_frame = 0;
        self.pause_generation += 1;
    }

    /// Register a parsed script. The registry is append-only: a script id
    /// that is already present is never overwritten by a later event.
    ///
    /// Returns whether the registry grew.
    pub fn on_script_parsed(&mut self, script: Script) -> bool {
        match self.scripts.entry(script.script_id.clone()) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                if *existing.get() != script {
                    tracing::warn!(
                        script_id = %script.script_id,
                        "scriptParsed for known script with different metadata; keeping original"
                    );
                }
                false
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(script);
                true
            }
        }
    }

    /// Transport close or error, from any state.
    pub fn on_disconnect(&mut self) {
        self.execution = ExecutionState::Disconnected;
        self.call_frames.clear();
        self.selected_frame = 0;
        self.pause_generation += 1;
    }

    /// Select a different call frame of the current pause.
    ///
    /// Only available while paused; does not alter the call-frame
    /// sequence itself.
    pub fn select_frame(&mut self, index: usize) -> eyre::Result<&CallFrame> {
        eyre::ensure!(
            self.execution == ExecutionState::Paused,
            "cannot select a call frame while not paused"
        );
        eyre::ensure!(
            index < self.call_frames.len(),
            "call frame index {index} out of range ({} frames)",
            self.call_frames.len()
        );
        self.selected_frame = index;
        Ok(&self.call_frames[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn frame(name: &str, script: &str, line: i64) -> CallFrame {
        CallFrame {
            call_frame_id: format!("frame-{name}"),
            function_name: name.to_string(),
            location: Location {
                script_id: script.to_string(),
                line_number: line,
                column_number: 0,
            },
            scope_chain: Vec::new(),
        }
    }

    fn script(id: &str, url: &str) -> Script {
        Script {
            script_id: id.to_string(),
            url: url.to_string(),
            start_line: 0,
            start_column: 0,
            end_line: 10,
            end_column: 0,
            hash: "h".to_string(),
        }
    }

    #[test]
    fn starts_disconnected() {
        let state = SessionState::new();
        assert_eq!(state.execution(), ExecutionState::Disconnected);
        assert!(state.call_frames().is_empty());
    }

    #[test]
    fn open_then_pause_then_resume() {
        let mut state = SessionState::new();
        state.on_open();
        assert_eq!(state.execution(), ExecutionState::Running);

        let generation = state.on_paused(vec![frame("foo", "s1", 4)]);
        assert!(generation.is_some());
        assert_eq!(state.execution(), ExecutionState::Paused);
        assert_eq!(state.call_frames().len(), 1);
        assert_eq!(state.selected_frame(), 0);
        assert_eq!(state.selected().unwrap().function_name, "foo");

        state.on_resumed();
        assert_eq!(state.execution(), ExecutionState::Running);
        assert_eq!(state.call_frames().len(), 0);
        assert_eq!(state.selected_frame(), 0);
    }

    #[test]
    fn new_pause_replaces_frames_wholesale() {
        let mut state = SessionState::new();
        state.on_open();

        state.on_paused(vec![frame("foo", "s1", 4), frame("bar", "s1", 9)]);
        state.select_frame(1).unwrap();

        state.on_paused(vec![frame("baz", "s2", 0)]);
        assert_eq!(state.call_frames().len(), 1);
        assert_eq!(state.selected_frame(), 0);
        assert_eq!(state.selected().unwrap().function_name, "baz");
    }

    // Observed quirk preserved deliberately: an empty-frame pause event
    // leaves the previous call-frame state untouched.
    #[test]
    fn paused_with_no_frames_is_ignored() {
        let mut state = SessionState::new();
        state.on_open();
        state.on_paused(vec![frame("foo", "s1", 4)]);
        let generation = state.pause_generation();

        assert!(state.on_paused(Vec::new()).is_none());
        assert_eq!(state.execution(), ExecutionState::Paused);
        assert_eq!(state.call_frames().len(), 1);
        assert_eq!(state.pause_generation(), generation);
    }

    #[test]
    fn script_registry_is_append_only() {
        let mut state = SessionState::new();
        state.on_open();

        assert!(state.on_script_parsed(script("s1", "a.js")));
        assert!(!state.on_script_parsed(script("s1", "b.js")));

        // the original entry survives
        assert_eq!(state.script("s1").unwrap().url, "a.js");
        assert_eq!(state.scripts().count(), 1);
    }

    #[test]
    fn script_parsed_does_not_change_execution_state() {
        let mut state = SessionState::new();
        state.on_open();
        state.on_paused(vec![frame("foo", "s1", 4)]);

        state.on_script_parsed(script("s2", "late.js"));
        assert_eq!(state.execution(), ExecutionState::Paused);
        assert_eq!(state.call_frames().len(), 1);
    }

    #[test]
    fn select_frame_requires_pause_and_bounds() {
        let mut state = SessionState::new();
        state.on_open();
        assert!(state.select_frame(0).is_err());

        state.on_paused(vec![frame("foo", "s1", 4), frame("bar", "s1", 9)]);
        assert!(state.select_frame(2).is_err());

        let selected = state.select_frame(1).unwrap();
        assert_eq!(selected.function_name, "bar");
        assert_eq!(state.selected_frame(), 1);
        // selection does not alter the frames themselves
        assert_eq!(state.call_frames().len(), 2);
    }

    #[test]
    fn disconnect_from_any_state() {
        let mut state = SessionState::new();
        state.on_open();
        state.on_paused(vec![frame("foo", "s1", 4)]);

        state.on_disconnect();
        assert_eq!(state.execution(), ExecutionState::Disconnected);
        assert!(state.call_frames().is_empty());
    }

    #[test]
    fn generation_advances_on_every_pause_and_resume() {
        let mut state = SessionState::new();
        state.on_open();

        let first = state.on_paused(vec![frame("foo", "s1", 4)]).unwrap();
        state.on_resumed();
        let second = state.on_paused(vec![frame("bar", "s1", 9)]).unwrap();
        assert!(second > first);
    }
}
