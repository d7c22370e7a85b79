//! Testing utilities for the transport layer.
//!
//! This module provides helpers for testing code that uses the wire
//! transport, including in-memory transports and frame construction
//! utilities.

mod memory;

pub use memory::MemoryTransport;

use serde::Serialize;

/// Construct a raw wire frame from a JSON-serializable message.
///
/// This is useful for constructing test data that can be fed to a
/// [`WireReader`](crate::WireReader).
///
/// # Example
///
/// ```
/// use wire::testing::frame_message;
/// use serde_json::json;
///
/// let bytes = frame_message(&json!({
///     "method": "Debugger.resumed",
///     "params": {}
/// }));
///
/// assert!(bytes.ends_with(b"\n"));
/// ```
pub fn frame_message(msg: &impl Serialize) -> Vec<u8> {
    let mut bytes = serde_json::to_vec(msg).expect("failed to serialize message");
    bytes.push(b'\n');
    bytes
}

/// Construct multiple wire frames concatenated together.
pub fn frame_messages<T: Serialize>(msgs: &[T]) -> Vec<u8> {
    msgs.iter().flat_map(|m| frame_message(m)).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_frame_message() {
        let bytes = frame_message(&json!({"method": "test", "params": {}}));
        let s = String::from_utf8(bytes).unwrap();

        assert!(s.ends_with('\n'));
        assert!(s.contains(r#""method":"test""#));
    }

    #[test]
    fn test_frame_messages() {
        let bytes = frame_messages(&[
            json!({"method": "a"}),
            json!({"method": "b"}),
        ]);
        let s = String::from_utf8(bytes).unwrap();

        assert_eq!(s.lines().count(), 2);
    }
}
