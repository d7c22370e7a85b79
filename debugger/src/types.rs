//! Protocol and view-model types for the debugger session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a loaded script.
pub type ScriptId = String;

/// One loaded source unit.
///
/// Created from a `Debugger.scriptParsed` event; immutable once created.
/// The registry only adds entries, never mutates existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub script_id: ScriptId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub start_line: i64,
    #[serde(default)]
    pub start_column: i64,
    #[serde(default)]
    pub end_line: i64,
    #[serde(default)]
    pub end_column: i64,
    /// Content hash of the script source.
    #[serde(default)]
    pub hash: String,
}

/// A source location, with 0-based protocol line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: ScriptId,
    pub line_number: i64,
    #[serde(default)]
    pub column_number: i64,
}

/// The kind of variable-binding context a scope represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Local,
    Closure,
    Catch,
    With,
    Block,
    Script,
    Eval,
    Module,
    #[serde(other)]
    Unknown,
}

/// A reference to an object held by the debug target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Opaque reference usable to fetch named properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Concrete value for primitives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Display fallback for non-primitive values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RemoteObject {
    /// Render the object for display.
    ///
    /// Concrete values win, then the description fallback; an absent
    /// value displays as the literal `undefined`, not omitted.
    pub fn display(&self) -> String {
        match (&self.value, &self.description) {
            (Some(value), _) => value.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => "undefined".to_string(),
        }
    }
}

/// One variable-binding context visible to a call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<RemoteObject>,
}

/// One activation record in a paused execution's stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(default)]
    pub call_frame_id: String,
    #[serde(default)]
    pub function_name: String,
    pub location: Location,
    /// Scope chain in the order delivered by the protocol; the order is
    /// preserved, never resorted.
    #[serde(default)]
    pub scope_chain: Vec<Scope>,
}

/// A breakpoint registered with the debug target.
///
/// Lifecycle is owned by the caller (UI); the session tracks these to
/// report pause reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub id: String,
    pub url: String,
    pub line: i64,
    pub enabled: bool,
}

/// One console message from the debug target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity/kind tag, e.g. `log`, `warning`, `error`.
    pub level: String,
    pub text: String,
}

/// One name/value pair from a scope's enumerable own properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyView {
    pub name: String,
    pub value: String,
}

/// Rendered view of one scope in a frame's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeView {
    pub kind: ScopeKind,
    pub properties: Vec<PropertyView>,
    /// Inline fetch-failure report for this scope only; other scopes in
    /// the chain are unaffected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Complete view-model of the selected call frame, handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameView {
    pub function_name: String,
    pub location: Location,
    /// 1-based line number for display. Protocol line numbers are
    /// 0-based; this conversion is a firm contract.
    pub display_line: i64,
    /// The single source line at the frame's location, if the source
    /// could be fetched and the line index is in range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_preview: Option<String>,
    pub scopes: Vec<ScopeView>,
}

/// Summary of a pause, published before frame enrichment completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedView {
    pub call_frames: Vec<CallFrame>,
    pub selected_frame: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hit_breakpoints: Vec<String>,
}

/// Result of evaluating an expression in the debug target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluateResult {
    pub output: String,
    pub error: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn remote_object_display_prefers_value() {
        let obj = RemoteObject {
            object_id: None,
            value: Some(json!(42)),
            description: Some("Number".to_string()),
        };
        assert_eq!(obj.display(), "42");
    }

    #[test]
    fn remote_object_display_falls_back_to_description() {
        let obj = RemoteObject {
            object_id: Some("obj-1".to_string()),
            value: None,
            description: Some("Array(3)".to_string()),
        };
        assert_eq!(obj.display(), "Array(3)");
    }

    #[test]
    fn remote_object_display_absent_value_is_undefined_literal() {
        let obj = RemoteObject::default();
        assert_eq!(obj.display(), "undefined");
    }

    #[test]
    fn call_frame_deserializes_from_protocol_shape() {
        let frame: CallFrame = serde_json::from_value(json!({
            "callFrameId": "frame-0",
            "functionName": "foo",
            "location": {"scriptId": "s1", "lineNumber": 4, "columnNumber": 2},
            "scopeChain": [
                {"type": "local", "object": {"objectId": "obj-1"}},
                {"type": "closure", "object": {"objectId": "obj-2"}},
                {"type": "global", "object": {"objectId": "obj-3"}}
            ]
        }))
        .unwrap();

        assert_eq!(frame.function_name, "foo");
        assert_eq!(frame.location.line_number, 4);
        // chain order preserved as delivered
        let kinds: Vec<ScopeKind> = frame.scope_chain.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ScopeKind::Local, ScopeKind::Closure, ScopeKind::Global]
        );
    }

    #[test]
    fn unknown_scope_kind_is_tolerated() {
        let scope: Scope = serde_json::from_value(json!({"type": "wasm-expression-stack"}))
            .unwrap();
        assert_eq!(scope.kind, ScopeKind::Unknown);
    }
}
