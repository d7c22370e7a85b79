//! Async transport layer for the remote-debug wire protocol.
//!
//! The protocol carries one JSON object per newline-terminated frame over
//! a persistent bidirectional socket. This crate handles only transport
//! concerns:
//!
//! - [`WireCodec`] implements `Encoder` and `Decoder` for framing
//! - [`WireReader`] wraps an `AsyncRead` to produce a `Stream` of raw
//!   messages
//! - [`WireWriter`] wraps an `AsyncWrite` to provide a `Sink` for
//!   outgoing frames
//! - [`classify`] determines whether a raw message is a command response
//!   or a protocol event from its field shape
//!
//! Request-response correlation, event routing and session state belong
//! in upstream crates (e.g. `debugger`).
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let (mut reader, mut writer) = wire::connect("127.0.0.1:9229").await?;
//!
//! writer.send(wire::OutgoingFrame::Command(command)).await?;
//!
//! while let Some(msg) = reader.next().await {
//!     match wire::classify(&msg?) {
//!         wire::Classification::Response { id } => { /* correlate */ }
//!         wire::Classification::Event { method } => { /* route */ }
//!         _ => { /* warn and drop */ }
//!     }
//! }
//! ```

mod codec;
mod error;
mod message;
mod reader;
mod transport;
mod writer;

pub mod testing;

pub use codec::WireCodec;
pub use error::WireError;
pub use message::{classify, Classification, Command, CommandId, OutgoingFrame};
pub use reader::WireReader;
pub use transport::{split, WireTransport};
pub use writer::WireWriter;

use std::io;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Connect to a debug target and return a reader/writer pair.
///
/// Connection establishment is asynchronous; a refused or unreachable
/// target surfaces as the returned `io::Error`, never a panic.
pub async fn connect(
    addr: impl ToSocketAddrs,
) -> io::Result<(
    WireReader<tokio::net::tcp::OwnedReadHalf>,
    WireWriter<tokio::net::tcp::OwnedWriteHalf>,
)> {
    let stream = TcpStream::connect(addr).await?;
    Ok(split(stream))
}
