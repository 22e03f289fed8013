use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::codec::{decode_packet, FrameConfig, LineDecoder};
use crate::error::{FrameError, Result};
use crate::packet::Packet;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete lines from any `AsyncRead` stream.
///
/// Handles partial reads internally — callers always get complete lines.
/// Bytes of an unterminated trailing line are dropped at end of stream.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: LineDecoder,
    config: FrameConfig,
}

impl<T: AsyncRead + Unpin> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: LineDecoder::new(config.max_line_len),
            config,
        }
    }

    /// Read the next complete line, terminator removed.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached and
    /// `Err(FrameError::LineTooLong)` once per over-long line; the reader
    /// stays usable after the latter.
    ///
    /// Cancel safe: a partially received line stays buffered.
    pub async fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.decoder.decode(&mut self.buf)? {
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk).await {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next line and decode it as a packet.
    pub async fn read_packet(&mut self) -> Result<Packet> {
        let line = self.read_line().await?;
        decode_packet(&line)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncWriteExt, ReadBuf};

    use super::*;
    use crate::packet::DeviceId;

    #[tokio::test]
    async fn read_single_line() {
        let mut reader = FrameReader::new(&b"hello\n"[..]);
        let line = reader.read_line().await.unwrap();
        assert_eq!(line.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn read_multiple_packets() {
        let wire = concat!(
            r#"{"id":"1","type":24}"#,
            "\n",
            r#"{"id":2,"type":26,"seq":7}"#,
            "\r\n",
        );
        let mut reader = FrameReader::new(wire.as_bytes());

        let p1 = reader.read_packet().await.unwrap();
        let p2 = reader.read_packet().await.unwrap();
        assert_eq!((p1.id, p1.kind), (DeviceId::from("1"), 24));
        assert_eq!((p2.id, p2.kind, p2.seq), (DeviceId::Number(2), 26, 7));
    }

    #[tokio::test]
    async fn partial_read_handling() {
        let reader = ByteByByteReader {
            bytes: br#"{"id":"9","type":30}"#.iter().copied().chain([b'\n']).collect(),
            pos: 0,
        };
        let mut reader = FrameReader::new(reader);

        let packet = reader.read_packet().await.unwrap();
        assert_eq!(packet.kind, 30);
    }

    #[tokio::test]
    async fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(&b""[..]);
        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn connection_closed_mid_line() {
        let mut reader = FrameReader::new(&br#"{"id":"1","ty"#[..]);
        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn decode_error_leaves_reader_usable() {
        let wire = b"not json\n{\"id\":\"1\",\"type\":28}\n";
        let mut reader = FrameReader::new(&wire[..]);

        let err = reader.read_packet().await.unwrap_err();
        assert!(err.is_decode_error());
        assert_eq!(reader.read_packet().await.unwrap().kind, 28);
    }

    #[tokio::test]
    async fn oversized_line_in_stream() {
        let mut wire = vec![b'z'; 64];
        wire.extend_from_slice(b"\n{\"id\":\"1\",\"type\":24}\n");
        let cfg = FrameConfig { max_line_len: 32 };
        let mut reader = FrameReader::with_config(&wire[..], cfg);

        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { .. }));
        assert_eq!(reader.read_packet().await.unwrap().kind, 24);
    }

    #[tokio::test]
    async fn reads_from_memory_link() {
        let (link, mut remote) = uavlink_transport::LinkStream::memory_pair(256);
        let mut reader = FrameReader::new(link);

        remote.write_all(b"{\"id\":\"1\",").await.unwrap();
        remote.write_all(b"\"type\":26}\n").await.unwrap();
        assert_eq!(reader.read_packet().await.unwrap().kind, 26);

        drop(remote);
        assert!(matches!(
            reader.read_line().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: b"ok\n".to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_line().await.unwrap().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(&b""[..]);
        assert_eq!(reader.config().max_line_len, crate::codec::DEFAULT_MAX_LINE);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for ByteByByteReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.pos < self.bytes.len() && buf.remaining() > 0 {
                let byte = self.bytes[self.pos];
                buf.put_slice(&[byte]);
                self.pos += 1;
            }
            Poll::Ready(Ok(()))
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for InterruptedThenData {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if !self.interrupted {
                self.interrupted = true;
                return Poll::Ready(Err(std::io::Error::from(ErrorKind::Interrupted)));
            }
            let n = (self.bytes.len() - self.pos).min(buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.bytes[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }
}
