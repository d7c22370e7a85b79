//! Wire message reader.
//!
//! This module provides [`WireReader`], a typed wrapper around a framed
//! async reader that produces a stream of raw protocol messages.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::WireCodec;
use crate::error::WireError;

pin_project! {
    /// An async stream of incoming protocol messages.
    ///
    /// `WireReader` wraps an [`AsyncRead`] source and decodes frames from
    /// the byte stream. It implements [`Stream`], allowing it to be used
    /// with async iteration patterns. Malformed frames are dropped by the
    /// codec and never appear as stream items or errors.
    pub struct WireReader<R> {
        #[pin]
        inner: FramedRead<R, WireCodec>,
    }
}

impl<R> WireReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a new reader from an async read source.
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, WireCodec::new()),
        }
    }

    /// Create a new reader with a custom codec.
    ///
    /// This allows configuring options like maximum frame size.
    pub fn with_codec(reader: R, codec: WireCodec) -> Self {
        Self {
            inner: FramedRead::new(reader, codec),
        }
    }

    /// Consume the reader and return the underlying source.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R> Stream for WireReader<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Value, WireError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}
