//! JSON messaging client with a streaming JSON parser.
//!
//! This library speaks a JSON messaging protocol in which every message is
//! a JSON object tagged with an `Action` field, sent back to back over a
//! TCP or WebSocket connection.
//!
//! # Architecture
//!
//! Two layers, bottom-up:
//!
//! - **Parser**: turns bytes into a flat table of entries describing one
//!   JSON object or array, or reports that more bytes are needed, or that
//!   the input is malformed
//! - **Protocol engine**: an event loop per connection that frames the
//!   inbound stream with the parser, dispatches by `Action`, correlates
//!   acknowledgements with outstanding requests by id and queues inbound
//!   messages for delivery
//!
//! # Quick Start
//!
//! ```no_run
//! use jsonmsg::{Connection, Message, RequestId, Result, Subscription};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::builder()
//!         .client_id("quickstart")
//!         .connect_websocket("ws://localhost:16102/")
//!         .await?;
//!
//!     // Acknowledged subscribe
//!     let rc = connection
//!         .subscribe(&Subscription::topic("greetings", "hello/#"), RequestId::new(1))
//!         .await?;
//!     println!("subscribe {rc}");
//!
//!     // Fire-and-forget publish
//!     connection
//!         .publish(&Message::topic("hello/world", "hi"), RequestId::CONNECT)
//!         .await?;
//!
//!     let message = connection.receive().await?;
//!     println!("{}: {:?}", message.destination(), message.body());
//!
//!     connection.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`json`] | Streaming JSON parser and accessors |
//! | [`protocol`] | Wire message types |
//! | [`connection`] | Connection API and event loop |
//! | [`transport`] | TCP and WebSocket transports |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Request id and return code wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Connection API and protocol engine.
///
/// Use [`Connection::builder()`] to open a connection.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers keep request ids and return codes apart from plain integers.
pub mod identifiers;

/// Streaming JSON parser.
pub mod json;

/// Wire protocol types.
pub mod protocol;

/// Byte transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{
    Connection, ConnectionBuilder, ConnectionOptions, ConnectionState, MessageHandler,
};

// Error types
pub use error::{DisconnectReason, Error, Result};

// Identifier types
pub use identifiers::{RequestId, ReturnCode};

// Parser types
pub use json::{Entry, EntryKind, JsonParser, ParseOutcome};

// Protocol types
pub use protocol::{Action, Body, Destination, Message, Request, Subscription};

// Transport types
pub use transport::{FrameReader, FrameWriter, StreamTransport, Transport, WebSocketTransport};
