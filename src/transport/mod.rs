//! Byte transports carrying the JSON stream.
//!
//! A transport is an opaque duplex stream split into a reader and a writer.
//! Reads may return any slice of the stream: part of an object, one object
//! or several concatenated objects. Reassembly belongs to the connection's
//! framer, never to the transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌──────────────────┐
//! │  Connection      │        TCP / WebSocket       │  Server          │
//! │                  │                              │                  │
//! │  event loop      │◄────────────────────────────►│  JSON messaging  │
//! │  FrameReader     │     {"Action":...}{...}      │  endpoint        │
//! │  FrameWriter     │                              │                  │
//! └──────────────────┘                              └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `stream` | Raw byte stream over TCP or any `AsyncRead + AsyncWrite` |
//! | `websocket` | WebSocket text/binary frames |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Raw byte stream transport.
pub mod stream;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use stream::{StreamReader, StreamTransport, StreamWriter};
pub use websocket::{WebSocketReader, WebSocketTransport, WebSocketWriter};

// ============================================================================
// Traits
// ============================================================================

/// Read half of a transport.
#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Reads the next chunk of bytes.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. The event
    /// loop races this future against outbound commands, so it must be
    /// cancel safe: dropping it must not lose bytes.
    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Write half of a transport.
#[async_trait]
pub trait FrameWriter: Send + 'static {
    /// Writes one serialized object.
    async fn write_frame(&mut self, frame: &str) -> Result<()>;

    /// Closes the transport.
    async fn close(&mut self) -> Result<()>;
}

/// A duplex transport that can be split into owned halves.
pub trait Transport: Send + 'static {
    /// Read half.
    type Reader: FrameReader;
    /// Write half.
    type Writer: FrameWriter;

    /// Splits the transport.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}
