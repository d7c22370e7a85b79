//! Typed protocol events.
//!
//! Inbound events arrive as a method name plus untyped params. Rather
//! than branching on raw strings throughout the session, the known
//! events deserialize into a closed set of variants here, with a generic
//! fallback for anything unrecognised.

use eyre::WrapErr;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{CallFrame, ConsoleMessage, RemoteObject, Script};

/// Body of a `Debugger.paused` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEventBody {
    #[serde(default)]
    pub call_frames: Vec<CallFrame>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub hit_breakpoints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleApiCalledBody {
    #[serde(rename = "type", default = "default_level")]
    level: String,
    #[serde(default)]
    args: Vec<RemoteObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageAddedBody {
    message: LegacyConsoleMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyConsoleMessage {
    #[serde(default = "default_level")]
    level: String,
    #[serde(default)]
    text: String,
}

fn default_level() -> String {
    "log".to_string()
}

/// An inbound protocol event, parsed from its method name and params.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// `Debugger.scriptParsed`
    ScriptParsed(Script),
    /// `Debugger.paused`
    Paused(PausedEventBody),
    /// `Debugger.resumed`
    Resumed,
    /// `Runtime.consoleAPICalled` or the legacy `Console.messageAdded`
    Console(ConsoleMessage),
    /// Any event the session does not model.
    Unrecognised { method: String, params: Value },
}

impl ProtocolEvent {
    /// Parse an event from its wire method and params.
    ///
    /// Fails only when a *known* method carries params that do not match
    /// its documented shape; unknown methods always succeed as
    /// [`ProtocolEvent::Unrecognised`].
    pub fn parse(method: &str, params: Value) -> eyre::Result<Self> {
        match method {
            "Debugger.scriptParsed" => {
                let script = serde_json::from_value(params)
                    .wrap_err("parsing scriptParsed event")?;
                Ok(Self::ScriptParsed(script))
            }
            "Debugger.paused" => {
                let body = serde_json::from_value(params).wrap_err("parsing paused event")?;
                Ok(Self::Paused(body))
            }
            "Debugger.resumed" => Ok(Self::Resumed),
            "Runtime.consoleAPICalled" => {
                let body: ConsoleApiCalledBody =
                    serde_json::from_value(params).wrap_err("parsing consoleAPICalled event")?;
                let text = body
                    .args
                    .iter()
                    .map(RemoteObject::display)
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(Self::Console(ConsoleMessage {
                    level: body.level,
                    text,
                }))
            }
            "Console.messageAdded" => {
                let body: MessageAddedBody =
                    serde_json::from_value(params).wrap_err("parsing messageAdded event")?;
                Ok(Self::Console(ConsoleMessage {
                    level: body.message.level,
                    text: body.message.text,
                }))
            }
            _ => Ok(Self::Unrecognised {
                method: method.to_string(),
                params,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_script_parsed() {
        let event = ProtocolEvent::parse(
            "Debugger.scriptParsed",
            json!({"scriptId": "s1", "url": "app.js", "endLine": 10, "hash": "abc"}),
        )
        .unwrap();

        let ProtocolEvent::ScriptParsed(script) = event else {
            panic!("expected ScriptParsed");
        };
        assert_eq!(script.script_id, "s1");
        assert_eq!(script.url, "app.js");
        assert_eq!(script.end_line, 10);
    }

    #[test]
    fn parse_paused_with_frames() {
        let event = ProtocolEvent::parse(
            "Debugger.paused",
            json!({
                "reason": "breakpoint",
                "hitBreakpoints": ["bp-1"],
                "callFrames": [{
                    "functionName": "foo",
                    "location": {"scriptId": "s1", "lineNumber": 4}
                }]
            }),
        )
        .unwrap();

        let ProtocolEvent::Paused(body) = event else {
            panic!("expected Paused");
        };
        assert_eq!(body.call_frames.len(), 1);
        assert_eq!(body.call_frames[0].function_name, "foo");
        assert_eq!(body.reason.as_deref(), Some("breakpoint"));
        assert_eq!(body.hit_breakpoints, vec!["bp-1".to_string()]);
    }

    #[test]
    fn parse_paused_with_missing_frames_field() {
        // observed event shape: a paused event with no frames at all
        let event = ProtocolEvent::parse("Debugger.paused", json!({})).unwrap();
        let ProtocolEvent::Paused(body) = event else {
            panic!("expected Paused");
        };
        assert!(body.call_frames.is_empty());
    }

    #[test]
    fn parse_console_api_called_joins_args() {
        let event = ProtocolEvent::parse(
            "Runtime.consoleAPICalled",
            json!({
                "type": "warning",
                "args": [
                    {"value": "temp:"},
                    {"value": 42},
                    {"objectId": "obj-1", "description": "Sensor"},
                    {}
                ]
            }),
        )
        .unwrap();

        let ProtocolEvent::Console(msg) = event else {
            panic!("expected Console");
        };
        assert_eq!(msg.level, "warning");
        assert_eq!(msg.text, "\"temp:\" 42 Sensor undefined");
    }

    #[test]
    fn parse_legacy_console_message() {
        let event = ProtocolEvent::parse(
            "Console.messageAdded",
            json!({"message": {"level": "error", "text": "oops"}}),
        )
        .unwrap();

        let ProtocolEvent::Console(msg) = event else {
            panic!("expected Console");
        };
        assert_eq!(msg.level, "error");
        assert_eq!(msg.text, "oops");
    }

    #[test]
    fn unknown_method_is_unrecognised() {
        let event =
            ProtocolEvent::parse("HeapProfiler.resetProfiles", json!({"x": 1})).unwrap();
        assert!(matches!(
            event,
            ProtocolEvent::Unrecognised { method, .. } if method == "HeapProfiler.resetProfiles"
        ));
    }

    #[test]
    fn known_method_with_bad_params_fails() {
        // scriptId is required for a script registry entry
        let result = ProtocolEvent::parse("Debugger.scriptParsed", json!({"url": 3}));
        assert!(result.is_err());
    }
}
