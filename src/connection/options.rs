//! Connection options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use jsonmsg::ConnectionOptions;
//!
//! let options = ConnectionOptions::new("client-1")
//!     .with_credentials("admin", "secret")
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_keepalive(Duration::from_secs(30));
//!
//! assert_eq!(options.client_id, "client-1");
//! assert_eq!(options.max_pending, 1000);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default time to wait for `Connected`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time `close` waits for the event loop to stop.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default limit on outstanding correlated requests.
pub const DEFAULT_MAX_PENDING: usize = 1000;

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Session and timing options of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Client identifier sent in `Connect`.
    pub client_id: String,

    /// User name. Omitted from `Connect` when empty.
    pub user: Option<String>,

    /// Password.
    pub password: Option<String>,

    /// Time to wait for `Connected`.
    pub connect_timeout: Duration,

    /// Time `close` waits for the event loop to stop.
    pub close_timeout: Duration,

    /// Interval between keep-alive pings. `None` disables them.
    pub keepalive: Option<Duration>,

    /// Maximum outstanding correlated requests.
    pub max_pending: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new(String::new())
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionOptions {
    /// Creates options with default timeouts.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            user: None,
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            keepalive: None,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Sets user name and password.
    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        let user = user.into();
        self.user = (!user.is_empty()).then_some(user);
        self.password = Some(password.into());
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the close timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Enables keep-alive pings.
    #[inline]
    #[must_use]
    pub fn with_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = Some(interval);
        self
    }

    /// Sets the limit on outstanding correlated requests.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::new("c");
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
        assert_eq!(options.close_timeout, Duration::from_secs(5));
        assert_eq!(options.keepalive, None);
        assert_eq!(options.max_pending, 1000);
        assert!(options.user.is_none());
    }

    #[test]
    fn test_empty_user_is_omitted() {
        let options = ConnectionOptions::new("c").with_credentials("", "pw");
        assert_eq!(options.user, None);
        assert_eq!(options.password.as_deref(), Some("pw"));
    }
}
