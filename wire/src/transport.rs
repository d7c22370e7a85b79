//! Transport abstraction and split functionality.
//!
//! This module provides the [`WireTransport`] trait for abstracting over
//! different async byte streams, and the [`split`] function for creating
//! reader/writer pairs.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::reader::WireReader;
use crate::writer::WireWriter;

/// A transport that can be split into separate read and write halves.
///
/// This trait abstracts over different async transports (TCP, in-memory
/// streams) to provide a uniform interface for the protocol layer.
pub trait WireTransport: Send + 'static {
    /// The read half type.
    type Read: AsyncRead + Unpin + Send + 'static;
    /// The write half type.
    type Write: AsyncWrite + Unpin + Send + 'static;

    /// Split the transport into separate read and write halves.
    fn into_split(self) -> (Self::Read, Self::Write);
}

impl WireTransport for TcpStream {
    type Read = OwnedReadHalf;
    type Write = OwnedWriteHalf;

    fn into_split(self) -> (Self::Read, Self::Write) {
        TcpStream::into_split(self)
    }
}

/// Split a transport into a wire reader and writer pair.
///
/// The returned reader and writer can be used independently and
/// concurrently, allowing upstream code to handle multiplexing as
/// needed.
pub fn split<T: WireTransport>(transport: T) -> (WireReader<T::Read>, WireWriter<T::Write>) {
    let (read, write) = transport.into_split();
    (WireReader::new(read), WireWriter::new(write))
}
