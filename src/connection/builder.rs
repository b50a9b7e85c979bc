//! Builder pattern for connection configuration.
//!
//! Provides a fluent API for configuring and opening [`Connection`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use jsonmsg::Connection;
//!
//! # async fn example() -> jsonmsg::Result<()> {
//! let connection = Connection::builder()
//!     .client_id("dashboard")
//!     .user("admin", "secret")
//!     .connect_timeout(Duration::from_secs(10))
//!     .listener(|message| println!("{:?}", message.body()))
//!     .connect_websocket("ws://broker.local:16102/")
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::net::ToSocketAddrs;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Message;
use crate::transport::{StreamTransport, Transport, WebSocketTransport};

use super::core::Connection;
use super::delivery::MessageHandler;
use super::options::ConnectionOptions;

// ============================================================================
// ConnectionBuilder
// ============================================================================

/// Builder for configuring a [`Connection`].
///
/// Use [`Connection::builder()`] to create a new builder.
#[must_use]
#[derive(Default)]
pub struct ConnectionBuilder {
    /// Session and timing options.
    options: ConnectionOptions,
    /// Optional message listener.
    handler: Option<MessageHandler>,
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("options", &self.options)
            .field("listener", &self.handler.is_some())
            .finish()
    }
}

// ============================================================================
// ConnectionBuilder Implementation
// ============================================================================

impl ConnectionBuilder {
    /// Creates a builder with default options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options.
    #[inline]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the client identifier. Required.
    #[inline]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.options.client_id = client_id.into();
        self
    }

    /// Sets user name and password.
    #[inline]
    pub fn user(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.options = self.options.with_credentials(user, password);
        self
    }

    /// Sets how long to wait for `Connected`.
    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets how long `close` waits for shutdown.
    #[inline]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.options.close_timeout = timeout;
        self
    }

    /// Enables keep-alive pings every `interval`.
    #[inline]
    pub fn keepalive(mut self, interval: Duration) -> Self {
        self.options.keepalive = Some(interval);
        self
    }

    /// Sets the limit on outstanding correlated requests.
    #[inline]
    pub fn max_pending(mut self, max: usize) -> Self {
        self.options.max_pending = max;
        self
    }

    /// Installs a message listener.
    ///
    /// The listener runs on its own task. While it is installed,
    /// [`Connection::receive`] fails with [`Error::ListenerActive`].
    #[inline]
    pub fn listener(mut self, handler: impl Fn(Message) + Send + Sync + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Opens a raw TCP connection and performs the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the client id is missing
    /// - [`Error::Io`] if the TCP connection fails
    /// - [`Error::ConnectTimeout`] or [`Error::ConnectRejected`] if the
    ///   handshake fails
    pub async fn connect_tcp(self, addr: impl ToSocketAddrs) -> Result<Connection> {
        self.validate()?;
        let transport = StreamTransport::connect(addr).await?;
        self.connect_with(transport).await
    }

    /// Opens a WebSocket connection and performs the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the client id is missing or the scheme is not `ws`/`wss`
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::WebSocket`] if the WebSocket handshake fails
    /// - [`Error::ConnectTimeout`] or [`Error::ConnectRejected`] if the
    ///   session handshake fails
    pub async fn connect_websocket(self, url: &str) -> Result<Connection> {
        self.validate()?;
        let url = Self::validate_url(url)?;
        let transport = WebSocketTransport::connect(&url).await?;
        self.connect_with(transport).await
    }

    /// Performs the handshake over an established transport.
    ///
    /// # Errors
    ///
    /// See [`connect_tcp`](Self::connect_tcp).
    pub async fn connect_with<T: Transport>(self, transport: T) -> Result<Connection> {
        self.validate()?;
        Connection::open(transport, self.options, self.handler).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionBuilder {
    fn validate(&self) -> Result<()> {
        if self.options.client_id.is_empty() {
            return Err(Error::config(
                "Client id is required. Use .client_id() to set it.\n\
                 Example: Connection::builder().client_id(\"sensor-7\")",
            ));
        }
        if self.options.max_pending == 0 {
            return Err(Error::config("max_pending must be at least 1"));
        }
        if self.options.keepalive.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::config(
                "keepalive interval must be greater than zero. Omit .keepalive() to disable it.",
            ));
        }
        Ok(())
    }

    fn validate_url(url: &str) -> Result<Url> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Unsupported WebSocket scheme '{scheme}', expected ws or wss"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
