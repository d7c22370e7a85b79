//! Wire message writer.
//!
//! This module provides [`WireWriter`], a typed wrapper around a framed
//! async writer for sending outgoing frames.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Sink;
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::WireCodec;
use crate::error::WireError;
use crate::message::OutgoingFrame;

pin_project! {
    /// An async sink for outgoing frames.
    ///
    /// `WireWriter` wraps an [`AsyncWrite`] destination and encodes
    /// frames to the wire format. It provides a simple `send` method for
    /// common usage.
    pub struct WireWriter<W> {
        #[pin]
        inner: FramedWrite<W, WireCodec>,
    }
}

impl<W> WireWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a new writer from an async write destination.
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, WireCodec::new()),
        }
    }

    /// Send a frame to the debug target.
    ///
    /// This is a convenience method that handles the full send cycle:
    /// feeding the frame, flushing, and awaiting completion.
    pub async fn send(&mut self, frame: OutgoingFrame) -> Result<(), WireError> {
        use futures::SinkExt;
        SinkExt::send(&mut self.inner, frame).await
    }

    /// Consume the writer and return the underlying destination.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W> Sink<OutgoingFrame> for WireWriter<W>
where
    W: AsyncWrite + Unpin,
{
    type Error = WireError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: OutgoingFrame) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}
