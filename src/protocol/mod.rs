//! Wire protocol types.
//!
//! Every object on the wire is a JSON object with an `Action` field.
//!
//! # Protocol Overview
//!
//! | Action | Direction | Key fields |
//! |--------|-----------|------------|
//! | `Connect` | Client → Server | `ClientID`, `User`, `Password` |
//! | `Connected` | Server → Client | `RC` |
//! | `Send` | Both | `Topic` or `Queue`, `Body`, `QoS`, `ID`, `Persistent`, `Retain` |
//! | `Ack` | Both | `ID`, `RC` |
//! | `Subscribe` | Client → Server | `Name`, `Topic` or `Queue`, `Durable`, `Shared`, `Nolocal`, `QoS`, `ID` |
//! | `CloseSubscription` | Client → Server | `Name` |
//! | `DestroySubscription` | Client → Server | `Name` |
//! | `GetRetained` | Client → Server | `Topic`, `ID` |
//! | `DeleteRetained` | Client → Server | `Topic`, `ID` |
//! | `Ping` / `Pong` | Both | |
//! | `Close` | Client → Server | |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Inbound action discriminant |
//! | `request` | Outbound control objects |
//! | `message` | Application messages |
//! | `subscription` | Subscription parameters |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound action discriminant.
pub mod action;

/// Application message types.
pub mod message;

/// Outbound request types.
pub mod request;

/// Subscription parameters.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::Action;
pub use message::{Body, Destination, Message};
pub use request::Request;
pub use subscription::Subscription;
