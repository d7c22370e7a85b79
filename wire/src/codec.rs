//! Framing codec implementation using tokio-util.
//!
//! Frames are newline-terminated JSON objects. The decoder yields each
//! frame as an untyped `serde_json::Value`; a frame that does not parse
//! as a JSON object is logged and skipped without terminating the
//! stream.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;
use crate::message::OutgoingFrame;

/// Default maximum frame size (16 MB).
const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Codec for encoding and decoding wire frames.
///
/// ```text
/// {"id":1,"method":"Debugger.enable","params":{}}\n
/// {"method":"Debugger.scriptParsed","params":{...}}\n
/// ```
#[derive(Debug, Clone)]
pub struct WireCodec {
    /// Maximum allowed frame size in bytes.
    max_frame_size: usize,
}

impl WireCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a new codec with a custom maximum frame size.
    ///
    /// An unterminated frame larger than this fails the stream with
    /// [`WireError::FrameTooLarge`].
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WireCodec {
    type Item = Value;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                // no complete frame yet
                if src.len() > self.max_frame_size {
                    return Err(WireError::FrameTooLarge {
                        size: src.len(),
                        max: self.max_frame_size,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(newline + 1);
            let mut body: &[u8] = &line[..newline];
            if body.ends_with(b"\r") {
                body = &body[..body.len() - 1];
            }
            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // a malformed frame must never crash the transport or block
            // subsequent frames
            match serde_json::from_slice::<Value>(body) {
                Ok(message) if message.is_object() => return Ok(Some(message)),
                Ok(other) => {
                    tracing::warn!(frame = %other, "dropping non-object frame");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unparseable frame");
                }
            }
        }
    }
}

impl Encoder<OutgoingFrame> for WireCodec {
    type Error = WireError;

    fn encode(&mut self, item: OutgoingFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(WireError::JsonSerialize)?;

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::{classify, Classification, Command};

    fn buf(raw: &str) -> BytesMut {
        BytesMut::from(raw)
    }

    #[test]
    fn decode_complete_frame() {
        let mut codec = WireCodec::new();
        let mut src = buf("{\"id\":1,\"result\":{}}\n");

        let msg = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(classify(&msg), Classification::Response { id: 1 });
        assert!(src.is_empty());
    }

    #[test]
    fn decode_incomplete_frame_waits_for_more_data() {
        let mut codec = WireCodec::new();
        let mut src = buf("{\"id\":1,\"resu");

        assert!(codec.decode(&mut src).unwrap().is_none());
        // data preserved for the next read
        assert!(!src.is_empty());
    }

    #[test]
    fn decode_multiple_frames() {
        let mut codec = WireCodec::new();
        let mut src = buf(
            "{\"method\":\"Debugger.scriptParsed\",\"params\":{}}\n{\"id\":2,\"result\":{}}\n",
        );

        let first = codec.decode(&mut src).unwrap().unwrap();
        assert!(matches!(classify(&first), Classification::Event { .. }));

        let second = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(classify(&second), Classification::Response { id: 2 });

        assert!(src.is_empty());
    }

    #[test]
    fn malformed_frame_is_skipped_not_fatal() {
        let mut codec = WireCodec::new();
        let mut src = buf("this is not json\n{\"id\":5,\"result\":\"ok\"}\n");

        // the bad line is consumed and the decoder moves on to the next
        // frame in the same call
        let msg = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(classify(&msg), Classification::Response { id: 5 });
    }

    #[test]
    fn non_object_frame_is_skipped() {
        let mut codec = WireCodec::new();
        let mut src = buf("42\n{\"method\":\"X\"}\n");

        let msg = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(msg, json!({"method": "X"}));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut codec = WireCodec::new();
        let mut src = buf("\r\n\n{\"id\":1,\"result\":{}}\n");

        let msg = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(classify(&msg), Classification::Response { id: 1 });
    }

    #[test]
    fn unterminated_frame_too_large() {
        let mut codec = WireCodec::with_max_size(16);
        let mut src = buf("{\"method\":\"aaaaaaaaaaaaaaaaaaaaaaaa");

        let result = codec.decode(&mut src);
        assert!(matches!(result, Err(WireError::FrameTooLarge { .. })));
    }

    #[test]
    fn encode_command() {
        let mut codec = WireCodec::new();
        let mut dst = BytesMut::new();

        codec
            .encode(
                OutgoingFrame::Command(Command {
                    id: 1,
                    method: "Console.enable".to_string(),
                    params: Some(json!({})),
                }),
                &mut dst,
            )
            .unwrap();

        assert_eq!(
            &dst[..],
            b"{\"id\":1,\"method\":\"Console.enable\",\"params\":{}}\n"
        );
    }

    #[test]
    fn encode_then_decode_raw_frame() {
        let mut codec = WireCodec::new();
        let mut dst = BytesMut::new();

        let event = json!({"method": "Debugger.resumed", "params": {}});
        codec
            .encode(OutgoingFrame::Raw(event.clone()), &mut dst)
            .unwrap();

        let decoded = codec.decode(&mut dst).unwrap().unwrap();
        assert_eq!(decoded, event);
    }
}
