//! Error types for the transport layer.

use std::io;

/// Errors that can occur while framing messages.
///
/// Note that a frame whose body is not valid JSON is *not* an error at
/// this level: it is logged and dropped inside the decoder so that one
/// bad frame never terminates the message stream.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An unterminated frame exceeds the configured maximum size.
    #[error("frame size {size} exceeds maximum allowed {max}")]
    FrameTooLarge {
        /// Bytes buffered so far without a frame terminator.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// Failed to serialize an outgoing frame to JSON.
    #[error("JSON serialization failed: {0}")]
    JsonSerialize(#[source] serde_json::Error),
}
