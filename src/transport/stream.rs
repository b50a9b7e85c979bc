//! Raw byte stream transport.
//!
//! Objects are written back to back with no delimiter. Works over a
//! [`TcpStream`] or any other async duplex stream such as
//! [`tokio::io::duplex`].

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

use crate::error::Result;

use super::{FrameReader, FrameWriter, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Size of the read buffer.
const READ_BUFFER_SIZE: usize = 8 * 1024;

// ============================================================================
// StreamTransport
// ============================================================================

/// Transport over an async byte stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl StreamTransport<TcpStream> {
    /// Opens a TCP connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the connection fails.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "TCP transport connected");
        Ok(Self { stream })
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps an established stream.
    #[inline]
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    type Reader = StreamReader<S>;
    type Writer = StreamWriter<S>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (read, write) = tokio::io::split(self.stream);
        (
            StreamReader {
                inner: read,
                buffer: vec![0; READ_BUFFER_SIZE],
            },
            StreamWriter { inner: write },
        )
    }
}

// ============================================================================
// StreamReader
// ============================================================================

/// Read half of a [`StreamTransport`].
#[derive(Debug)]
pub struct StreamReader<S> {
    inner: ReadHalf<S>,
    buffer: Vec<u8>,
}

#[async_trait]
impl<S> FrameReader for StreamReader<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let n = self.inner.read(&mut self.buffer).await?;
        if n == 0 {
            return Ok(None);
        }
        trace!(bytes = n, "Stream read");
        Ok(Some(self.buffer[..n].to_vec()))
    }
}

// ============================================================================
// StreamWriter
// ============================================================================

/// Write half of a [`StreamTransport`].
#[derive(Debug)]
pub struct StreamWriter<S> {
    inner: WriteHalf<S>,
}

#[async_trait]
impl<S> FrameWriter for StreamWriter<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.inner.write_all(frame.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
