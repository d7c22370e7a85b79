//! In-memory transport for testing.

use tokio::io::{duplex, DuplexStream};

use crate::transport::WireTransport;

/// An in-memory transport for testing protocol communication.
///
/// `MemoryTransport` uses tokio's [`DuplexStream`] to provide a
/// bidirectional in-memory channel that can be split into read and write
/// halves.
///
/// # Example
///
/// ```
/// use wire::testing::MemoryTransport;
/// use wire::split;
///
/// // Create a connected pair of transports
/// let (client_transport, server_transport) = MemoryTransport::pair();
///
/// // Split into reader/writer pairs
/// let (client_reader, client_writer) = split(client_transport);
/// let (server_reader, server_writer) = split(server_transport);
///
/// // Now client_writer -> server_reader and server_writer -> client_reader
/// ```
pub struct MemoryTransport {
    read: DuplexStream,
    write: DuplexStream,
}

impl MemoryTransport {
    /// Create a connected pair of in-memory transports.
    ///
    /// Frames sent on one transport's writer are received on the other
    /// transport's reader, simulating a bidirectional connection.
    ///
    /// Uses a default buffer size of 64KB for each direction.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_buffer_size(64 * 1024)
    }

    /// Create a connected pair with a custom buffer size.
    pub fn pair_with_buffer_size(buffer_size: usize) -> (Self, Self) {
        let (a_to_b_write, a_to_b_read) = duplex(buffer_size);
        let (b_to_a_write, b_to_a_read) = duplex(buffer_size);

        let transport_a = MemoryTransport {
            read: b_to_a_read,
            write: a_to_b_write,
        };

        let transport_b = MemoryTransport {
            read: a_to_b_read,
            write: b_to_a_write,
        };

        (transport_a, transport_b)
    }
}

impl WireTransport for MemoryTransport {
    type Read = DuplexStream;
    type Write = DuplexStream;

    fn into_split(self) -> (Self::Read, Self::Write) {
        (self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::message::{Command, OutgoingFrame};
    use crate::split;

    #[tokio::test]
    async fn memory_transport_roundtrip() {
        let (client, server) = MemoryTransport::pair();

        let (mut client_reader, mut client_writer) = split(client);
        let (mut server_reader, mut server_writer) = split(server);

        // client sends a command
        client_writer
            .send(OutgoingFrame::Command(Command {
                id: 1,
                method: "Runtime.enable".to_string(),
                params: Some(json!({})),
            }))
            .await
            .unwrap();

        let msg = server_reader.next().await.unwrap().unwrap();
        assert_eq!(msg["method"], "Runtime.enable");

        // server replies
        server_writer
            .send(OutgoingFrame::Raw(json!({"id": 1, "result": {}})))
            .await
            .unwrap();

        let msg = client_reader.next().await.unwrap().unwrap();
        assert_eq!(msg["id"], 1);
    }

    #[tokio::test]
    async fn memory_transport_close_signals_eof() {
        let (client, server) = MemoryTransport::pair();

        let (_client_reader, client_writer) = split(client);
        let (mut server_reader, _server_writer) = split(server);

        drop(client_writer);

        assert!(server_reader.next().await.is_none());
    }
}
