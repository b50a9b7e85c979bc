//! WebSocket transport.
//!
//! Each text or binary frame is handed to the framer as raw bytes. A frame
//! need not hold exactly one object. Control frames are answered by
//! tungstenite and never reach the framer.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::Result;

use super::{FrameReader, FrameWriter, Transport};

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport over a WebSocket connection.
#[derive(Debug)]
pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    stream: WebSocketStream<S>,
}

impl WebSocketTransport {
    /// Performs the WebSocket handshake with `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`](crate::Error::WebSocket) if the
    /// connection or handshake fails.
    pub async fn connect(url: &Url) -> Result<Self> {
        let (stream, response) = connect_async(url.as_str()).await?;
        debug!(%url, status = %response.status(), "WebSocket transport connected");
        Ok(Self { stream })
    }
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an established WebSocket stream.
    #[inline]
    #[must_use]
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Reader = WebSocketReader<S>;
    type Writer = WebSocketWriter<S>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let (sink, stream) = self.stream.split();
        (WebSocketReader { stream }, WebSocketWriter { sink })
    }
}

// ============================================================================
// WebSocketReader
// ============================================================================

/// Read half of a [`WebSocketTransport`].
#[derive(Debug)]
pub struct WebSocketReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameReader for WebSocketReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(bytes = text.len(), "WebSocket text frame");
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(bytes = data.len(), "WebSocket binary frame");
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    return Ok(None);
                }
                // Ping, Pong and raw frames
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }
}

// ============================================================================
// WebSocketWriter
// ============================================================================

/// Write half of a [`WebSocketTransport`].
#[derive(Debug)]
pub struct WebSocketWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameWriter for WebSocketWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.sink.send(Message::Text(frame.to_owned().into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    async fn pair() -> (
        WebSocketTransport<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (client, server) = tokio::io::duplex(1024);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
        (WebSocketTransport::new(client), server)
    }

    #[tokio::test]
    async fn test_text_frames_in_both_directions() {
        let (transport, mut server) = pair().await;
        let (mut reader, mut writer) = transport.into_split();

        writer.write_frame(r#"{"Action":"Ping"}"#).await.unwrap();
        let frame = server.next().await.unwrap().unwrap();
        assert_eq!(frame.into_text().unwrap().as_str(), r#"{"Action":"Ping"}"#);

        server
            .send(Message::Text(r#"{"Action":"Pong"}"#.into()))
            .await
            .unwrap();
        let chunk = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(chunk, br#"{"Action":"Pong"}"#);
    }

    #[tokio::test]
    async fn test_close_frame_ends_stream() {
        let (transport, mut server) = pair().await;
        let (mut reader, _writer) = transport.into_split();

        server.close(None).await.unwrap();
        assert!(reader.read_frame().await.unwrap().is_none());
    }
}
