//! Inbound action discriminant.

use std::fmt;

/// Value of the `Action` field of an inbound object.
///
/// Any other value is a framing fault and closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Application message published to this client.
    Send,
    /// Acknowledgement of a correlated request.
    Ack,
    /// Acknowledgement of `Connect`.
    Connected,
    /// Heartbeat request, answered with `Pong`.
    Ping,
    /// Heartbeat response.
    Pong,
}

impl Action {
    /// Parses an `Action` value. Matching is case sensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Send" => Some(Self::Send),
            "Ack" => Some(Self::Ack),
            "Connected" => Some(Self::Connected),
            "Ping" => Some(Self::Ping),
            "Pong" => Some(Self::Pong),
            _ => None,
        }
    }

    /// Wire name of the action.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Send => "Send",
            Self::Ack => "Ack",
            Self::Connected => "Connected",
            Self::Ping => "Ping",
            Self::Pong => "Pong",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
