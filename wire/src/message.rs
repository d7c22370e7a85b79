//! Wire message types and shape classification.
//!
//! Inbound messages are kept untyped (`serde_json::Value`): the protocol
//! identifies responses and events by which fields are present, not by a
//! type tag, so classification is a shape check rather than an enum
//! deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation id linking an outgoing command to its eventual response.
pub type CommandId = u64;

/// An outgoing command.
///
/// Serializes as `{"id": <int>, "method": "<Domain.method>", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id, assigned by the dispatcher. Starts at 1 and is
    /// never reused for the lifetime of the connection.
    pub id: CommandId,
    /// Protocol method, e.g. `Debugger.enable`.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// An outgoing frame to encode onto the socket.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingFrame {
    /// A command from the dispatcher.
    Command(Command),
    /// An arbitrary JSON object (mock peers in tests).
    Raw(Value),
}

/// The shape of an inbound message.
///
/// Exactly one of four shapes is valid; this table is the complete
/// classification policy:
///
/// | has id | has method | classification |
/// |--------|------------|----------------|
/// | yes    | no         | Response       |
/// | no     | yes        | Event          |
/// | yes    | yes        | Ambiguous      |
/// | no     | no         | Unknown        |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A response to a previously sent command; dispatch on topic
    /// `response:<id>`.
    Response {
        /// The correlation id of the command this responds to.
        id: CommandId,
    },
    /// An asynchronous protocol event; dispatch on the method name.
    Event {
        /// The event method, e.g. `Debugger.paused`.
        method: String,
    },
    /// Both `id` and `method` present; not a valid shape.
    Ambiguous,
    /// Neither `id` nor `method` present; not a valid shape.
    Unknown,
}

/// Classify an inbound message by the presence of its `id` and `method`
/// fields.
///
/// A response carrying an `error` field is still a `Response` here; the
/// pending-command resolver decides whether `error` means rejection.
pub fn classify(message: &Value) -> Classification {
    let id = message.get("id").and_then(Value::as_u64);
    let method = message.get("method").and_then(Value::as_str);

    match (id, method) {
        (Some(id), None) => Classification::Response { id },
        (None, Some(method)) => Classification::Event {
            method: method.to_string(),
        },
        (Some(_), Some(_)) => Classification::Ambiguous,
        (None, None) => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn response_shape() {
        let msg = json!({"id": 3, "result": {}});
        assert_eq!(classify(&msg), Classification::Response { id: 3 });
    }

    #[test]
    fn error_response_is_still_a_response() {
        let msg = json!({"id": 7, "error": {"message": "no such method"}});
        assert_eq!(classify(&msg), Classification::Response { id: 7 });
    }

    #[test]
    fn event_shape() {
        let msg = json!({"method": "Debugger.paused", "params": {}});
        assert_eq!(
            classify(&msg),
            Classification::Event {
                method: "Debugger.paused".to_string()
            }
        );
    }

    #[test]
    fn both_fields_is_ambiguous() {
        let msg = json!({"id": 1, "method": "X"});
        assert_eq!(classify(&msg), Classification::Ambiguous);
    }

    #[test]
    fn neither_field_is_unknown() {
        let msg = json!({"result": {}});
        assert_eq!(classify(&msg), Classification::Unknown);
    }

    #[test]
    fn serialize_command() {
        let cmd = Command {
            id: 1,
            method: "Debugger.enable".to_string(),
            params: Some(json!({})),
        };

        let encoded = serde_json::to_string(&OutgoingFrame::Command(cmd)).unwrap();
        assert_eq!(
            encoded,
            r#"{"id":1,"method":"Debugger.enable","params":{}}"#
        );
    }

    #[test]
    fn command_without_params_omits_field() {
        let cmd = Command {
            id: 2,
            method: "Runtime.enable".to_string(),
            params: None,
        };

        let encoded = serde_json::to_string(&cmd).unwrap();
        assert!(!encoded.contains("params"));
    }
}
