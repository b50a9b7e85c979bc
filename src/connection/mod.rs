//! Protocol engine.
//!
//! Turns a framed byte stream into a request/acknowledge API.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Connection`] | Cloneable handle for publishing, subscribing and receiving |
//! | [`ConnectionBuilder`] | Fluent configuration and connect |
//! | [`ConnectionOptions`] | Session and timing options |
//! | [`ConnectionState`] | Lifecycle state |
//! | [`MessageHandler`] | Listener callback type |
//!
//! # Architecture
//!
//! ```text
//!  caller tasks                event loop task                 transport
//! ┌────────────┐  Command   ┌─────────────────────┐   bytes   ┌──────────┐
//! │ Connection │ ─────────► │ writer              │ ────────► │          │
//! │            │            │                     │           │  server  │
//! │  pending ◄─┼─── Ack ────┤ framer ► dispatch   │ ◄──────── │          │
//! │  receive ◄─┼── Send ────┤   │                 │           └──────────┘
//! └────────────┘  delivery  └───┼─────────────────┘
//!                 queue         └─► listener task (optional)
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for connections.
pub mod builder;

/// Connection handle and request API.
pub mod core;

/// Inbound delivery queue and listener task.
mod delivery;

/// Event loop task.
mod event_loop;

/// Stream reassembly.
mod framer;

/// Connection options.
pub mod options;

/// Pending request table.
mod pending;

/// Lifecycle state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectionBuilder;
pub use core::Connection;
pub use delivery::MessageHandler;
pub use options::ConnectionOptions;
pub use state::ConnectionState;
