//! Connection lifecycle state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::watch;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle of a connection.
///
/// ```text
/// Disconnected ─► Connecting ─► Connected ─► Closing ─► Closed
///                      │                        ▲
///                      └────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport yet.
    Disconnected,
    /// Transport open, `Connect` sent, waiting for `Connected`.
    Connecting,
    /// Session established.
    Connected,
    /// Shutting down after `close` or a fault.
    Closing,
    /// Event loop has stopped.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if a move from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting | Self::Connected, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns `true` once the connection will not carry traffic again.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Shared, observable connection state.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    #[inline]
    pub(crate) fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Moves to `next` if the transition is allowed. Returns whether it moved.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Marks the connection `Closed` from whatever state it is in.
    ///
    /// Only the event loop calls this, once, as it exits.
    pub(crate) fn finish(&self) {
        self.tx.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
            true
        });
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use ConnectionState::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Closing));
        assert!(Connected.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Connecting));
        assert!(!Closing.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Closed));
    }

    #[test]
    fn test_state_cell() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();

        assert!(cell.transition(Connecting));
        assert!(!cell.transition(Closed));
        assert_eq!(cell.get(), Connecting);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        cell.finish();
        assert_eq!(cell.get(), Closed);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(Closing.to_string(), "closing");
    }
}
