use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, ReadHalf, WriteHalf};

use crate::error::Result;

/// A connected link — implements `AsyncRead + AsyncWrite`.
///
/// This is the fundamental I/O type returned by [`Connector::connect`].
/// With the `serial` feature it can wrap a serial port; it can always wrap
/// an in-process duplex pipe.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Memory(DuplexStream),
    #[cfg(feature = "serial")]
    Serial(crate::serial::SerialBridge),
}

/// Opens links on demand.
///
/// A failed `connect` is the "unavailable" outcome: the caller decides
/// whether and when to try again. Implementations that touch blocking
/// devices must not block the calling task.
pub trait Connector: Send + Sync {
    /// Open a fresh link.
    fn connect(&self) -> impl Future<Output = Result<LinkStream>> + Send;

    /// Human-readable endpoint for diagnostics.
    fn endpoint(&self) -> String;
}

impl<C: Connector> Connector for std::sync::Arc<C> {
    fn connect(&self) -> impl Future<Output = Result<LinkStream>> + Send {
        (**self).connect()
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}

impl LinkStream {
    /// Wrap one end of an in-process duplex pipe.
    pub fn memory(stream: DuplexStream) -> Self {
        Self {
            inner: LinkStreamInner::Memory(stream),
        }
    }

    /// Create a connected pair: the link and the remote (device) end.
    pub fn memory_pair(capacity: usize) -> (Self, DuplexStream) {
        let (local, remote) = tokio::io::duplex(capacity);
        (Self::memory(local), remote)
    }

    #[cfg(feature = "serial")]
    pub(crate) fn from_serial(bridge: crate::serial::SerialBridge) -> Self {
        Self {
            inner: LinkStreamInner::Serial(bridge),
        }
    }

    /// Split into independently owned read and write halves.
    pub fn split(self) -> (ReadHalf<LinkStream>, WriteHalf<LinkStream>) {
        tokio::io::split(self)
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            LinkStreamInner::Memory(_) => "memory",
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(_) => "serial",
        }
    }
}

impl AsyncRead for LinkStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.inner {
            LinkStreamInner::Memory(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(bridge) => Pin::new(bridge.stream_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for LinkStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.inner {
            LinkStreamInner::Memory(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(bridge) => Pin::new(bridge.stream_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.inner {
            LinkStreamInner::Memory(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(bridge) => Pin::new(bridge.stream_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.inner {
            LinkStreamInner::Memory(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(bridge) => Pin::new(bridge.stream_mut()).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
