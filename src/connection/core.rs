//! Connection to a JSON messaging server.
//!
//! A [`Connection`] is a cheap, cloneable handle. The transport itself is
//! owned by the event loop task, so any number of tasks can issue requests
//! on the same connection concurrently.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use jsonmsg::{Connection, Message, RequestId, Subscription};
//!
//! # async fn example() -> jsonmsg::Result<()> {
//! let connection = Connection::builder()
//!     .client_id("sensor-7")
//!     .connect_tcp("127.0.0.1:16102")
//!     .await?;
//!
//! connection
//!     .subscribe(&Subscription::topic("cmd", "sensors/7/cmd"), RequestId::new(1))
//!     .await?;
//!
//! let rc = connection
//!     .publish_within(
//!         &Message::topic("sensors/7/temp", "21.5").with_qos(1),
//!         RequestId::new(2),
//!         Duration::from_secs(5),
//!     )
//!     .await?;
//! assert!(rc.is_success());
//!
//! let command = connection.receive().await?;
//! println!("{:?}", command.body());
//!
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Return Codes
//!
//! Correlated operations return a [`ReturnCode`]: zero on success, the
//! server's code when it reported an error, or [`ReturnCode::TIMEOUT`] if
//! a `_within` deadline expired first. Operations sent with id zero return
//! [`ReturnCode::SUCCESS`] as soon as the request is written.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, ReturnCode};
use crate::protocol::{Message, Request, Subscription};
use crate::transport::Transport;

use super::builder::ConnectionBuilder;
use super::delivery::{self, Delivery, DeliveryQueue, MessageHandler};
use super::event_loop::{EventLoop, Outbound};
use super::options::ConnectionOptions;
use super::pending::PendingTable;
use super::state::{ConnectionState, StateCell};

// ============================================================================
// Types
// ============================================================================

/// State shared between the API handles and the event loop.
#[derive(Debug)]
pub(crate) struct Shared {
    /// Waiters for correlated replies.
    pub pending: PendingTable,
    /// Lifecycle state.
    pub state: StateCell,
}

impl Shared {
    pub(crate) fn new(max_pending: usize) -> Self {
        Self {
            pending: PendingTable::new(max_pending),
            state: StateCell::new(),
        }
    }
}

/// Internal state behind a [`Connection`] handle.
struct Inner {
    outbound: Outbound,
    shared: Arc<Shared>,
    /// `None` when a listener task drains the queue.
    deliveries: Option<DeliveryQueue>,
    options: ConnectionOptions,
}

// ============================================================================
// Connection
// ============================================================================

/// An established session with a JSON messaging server.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and clones share one session. The session
/// ends when [`close`](Self::close) is called, the server disconnects, or
/// every clone is dropped.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("client_id", &self.inner.options.client_id)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl Connection {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Starts the event loop on `transport` and performs the handshake.
    pub(crate) async fn open<T: Transport>(
        transport: T,
        options: ConnectionOptions,
        handler: Option<MessageHandler>,
    ) -> Result<Self> {
        let (reader, writer) = transport.into_split();
        let shared = Arc::new(Shared::new(options.max_pending));
        let (outbound, commands) = Outbound::channel();
        let (delivery_tx, queue) = delivery::channel();

        shared.state.transition(ConnectionState::Connecting);
        tokio::spawn(
            EventLoop::new(
                reader,
                writer,
                commands,
                Arc::clone(&shared),
                delivery_tx,
                options.keepalive,
            )
            .run(),
        );

        let deliveries = match handler {
            Some(handler) => {
                delivery::spawn_listener(queue, handler, outbound.downgrade());
                None
            }
            None => Some(queue),
        };

        let connection = Self {
            inner: Arc::new(Inner {
                outbound,
                shared,
                deliveries,
                options,
            }),
        };
        connection.handshake().await?;
        Ok(connection)
    }

    /// Sends `Connect` under id 0 and waits for `Connected`.
    async fn handshake(&self) -> Result<()> {
        let options = &self.inner.options;
        let pending = &self.inner.shared.pending;

        let reply_rx = pending.register(RequestId::CONNECT)?;
        let request = Request::Connect {
            client_id: options.client_id.clone(),
            user: options.user.clone(),
            password: options.password.clone(),
        };

        if let Err(e) = self.inner.outbound.write(&request).await {
            pending.remove(RequestId::CONNECT);
            self.abort();
            return Err(e);
        }

        let completion = match timeout(options.connect_timeout, reply_rx).await {
            Ok(completion) => completion,
            Err(_) => {
                pending.remove(RequestId::CONNECT);
                warn!(
                    client_id = %options.client_id,
                    timeout_ms = options.connect_timeout.as_millis() as u64,
                    "Connect timed out"
                );
                self.abort();
                return Err(Error::connect_timeout(
                    options.connect_timeout.as_millis() as u64
                ));
            }
        };

        match completion {
            Ok(Ok(rc)) if rc.is_success() => {
                if !self.inner.shared.state.transition(ConnectionState::Connected) {
                    return Err(Error::ConnectionClosed);
                }
                info!(client_id = %options.client_id, "Connected");
                Ok(())
            }
            Ok(Ok(rc)) => {
                warn!(client_id = %options.client_id, %rc, "Connect rejected");
                self.abort();
                Err(Error::connect_rejected(rc.code()))
            }
            Ok(Err(reason)) => Err(Error::Disconnected(reason)),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }

    /// Stops the event loop without waiting for it.
    fn abort(&self) {
        self.inner.shared.state.transition(ConnectionState::Closing);
        self.inner.outbound.shutdown();
    }

    /// Closes the session.
    ///
    /// Sends `Close`, closes the transport and waits up to the configured
    /// close timeout for the event loop to stop. Closing an already closed
    /// connection succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the event loop did not stop in time.
    pub async fn close(&self) -> Result<()> {
        let state = &self.inner.shared.state;

        if state.transition(ConnectionState::Closing) {
            debug!(client_id = %self.inner.options.client_id, "Closing connection");
            self.inner.outbound.post(&Request::Close);
            self.inner.outbound.shutdown();
        }

        let close_timeout = self.inner.options.close_timeout;
        let mut state_rx = state.subscribe();
        match timeout(close_timeout, state_rx.wait_for(|s| *s == ConnectionState::Closed)).await {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::timeout("close", close_timeout.as_millis() as u64)),
        }
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state.get()
    }

    /// Returns `true` while the session is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of correlated requests awaiting acknowledgement.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.shared.pending.len()
    }

    /// Client identifier of the session.
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.options.client_id
    }
}

// ============================================================================
// Connection - Requests
// ============================================================================

impl Connection {
    /// Subscribes and waits for the acknowledgement if `id` is non-zero.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not established
    /// - [`Error::DuplicateRequest`] if `id` is already outstanding
    /// - [`Error::Disconnected`] if the connection dropped while waiting
    pub async fn subscribe(&self, subscription: &Subscription, id: RequestId) -> Result<ReturnCode> {
        self.request(Request::subscribe(subscription, id), id, None)
            .await
    }

    /// Subscribes and waits at most `wait` for the acknowledgement.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn subscribe_within(
        &self,
        subscription: &Subscription,
        id: RequestId,
        wait: Duration,
    ) -> Result<ReturnCode> {
        self.request(Request::subscribe(subscription, id), id, Some(wait))
            .await
    }

    /// Publishes `message` and waits for the acknowledgement if `id` is non-zero.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn publish(&self, message: &Message, id: RequestId) -> Result<ReturnCode> {
        self.request(Request::send(message, id), id, None).await
    }

    /// Publishes `message` and waits at most `wait` for the acknowledgement.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn publish_within(
        &self,
        message: &Message,
        id: RequestId,
        wait: Duration,
    ) -> Result<ReturnCode> {
        self.request(Request::send(message, id), id, Some(wait))
            .await
    }

    /// Stops delivery for the named subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the session is not established.
    pub async fn close_subscription(&self, name: impl Into<String>) -> Result<()> {
        let request = Request::CloseSubscription { name: name.into() };
        self.request(request, RequestId::CONNECT, None).await?;
        Ok(())
    }

    /// Removes the named durable subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the session is not established.
    pub async fn destroy_subscription(&self, name: impl Into<String>) -> Result<()> {
        let request = Request::DestroySubscription { name: name.into() };
        self.request(request, RequestId::CONNECT, None).await?;
        Ok(())
    }

    /// Asks the server to deliver the retained message of `topic`.
    ///
    /// The retained message arrives on the delivery queue. `id` is passed to
    /// the server but no acknowledgement is awaited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the session is not established.
    pub async fn get_retained(&self, topic: impl Into<String>, id: RequestId) -> Result<()> {
        let request = Request::GetRetained {
            topic: topic.into(),
            id,
        };
        self.request(request, RequestId::CONNECT, None).await?;
        Ok(())
    }

    /// Deletes the retained message of `topic`.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn delete_retained(&self, topic: impl Into<String>, id: RequestId) -> Result<ReturnCode> {
        let request = Request::DeleteRetained {
            topic: topic.into(),
            id,
        };
        self.request(request, id, None).await
    }

    /// Deletes the retained message of `topic`, waiting at most `wait`.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub async fn delete_retained_within(
        &self,
        topic: impl Into<String>,
        id: RequestId,
        wait: Duration,
    ) -> Result<ReturnCode> {
        let request = Request::DeleteRetained {
            topic: topic.into(),
            id,
        };
        self.request(request, id, Some(wait)).await
    }

    /// Sends a heartbeat `Ping`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the session is not established.
    pub async fn ping(&self) -> Result<()> {
        self.request(Request::Ping, RequestId::CONNECT, None).await?;
        Ok(())
    }

    /// Writes `request`, then waits for the acknowledgement of `id`.
    ///
    /// The waiter is registered before the write so a fast reply cannot be
    /// missed. A wait that expires removes the waiter and reports
    /// [`ReturnCode::TIMEOUT`].
    async fn request(
        &self,
        request: Request,
        id: RequestId,
        wait: Option<Duration>,
    ) -> Result<ReturnCode> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(Error::not_connected(state));
        }

        let pending = &self.inner.shared.pending;
        let reply_rx = if id.is_correlated() {
            Some(pending.register(id)?)
        } else {
            None
        };

        if let Err(e) = self.inner.outbound.write(&request).await {
            if id.is_correlated() {
                pending.remove(id);
            }
            return Err(e);
        }

        let Some(reply_rx) = reply_rx else {
            return Ok(ReturnCode::SUCCESS);
        };

        let completion = match wait {
            Some(wait) => match timeout(wait, reply_rx).await {
                Ok(completion) => completion,
                Err(_) => {
                    pending.remove(id);
                    debug!(%id, action = request.action(), timeout_ms = wait.as_millis() as u64, "Request timed out");
                    return Ok(ReturnCode::TIMEOUT);
                }
            },
            None => reply_rx.await,
        };

        match completion {
            Ok(Ok(rc)) => Ok(rc),
            Ok(Err(reason)) => Err(Error::Disconnected(reason)),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

// ============================================================================
// Connection - Delivery
// ============================================================================

impl Connection {
    /// Waits for the next inbound message.
    ///
    /// QoS>0 messages are acknowledged before being returned.
    ///
    /// # Errors
    ///
    /// - [`Error::ListenerActive`] if a message listener was installed
    /// - [`Error::Disconnected`] when the connection drops, once
    /// - [`Error::ConnectionClosed`] on every call after that
    pub async fn receive(&self) -> Result<Message> {
        let queue = self.deliveries()?;
        self.accept(queue.next().await)
    }

    /// Waits at most `wait` for the next inbound message.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    ///
    /// # Errors
    ///
    /// See [`receive`](Self::receive).
    pub async fn receive_timeout(&self, wait: Duration) -> Result<Option<Message>> {
        let queue = self.deliveries()?;
        match queue.next_timeout(wait).await {
            Ok(delivery) => self.accept(delivery).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn deliveries(&self) -> Result<&DeliveryQueue> {
        self.inner.deliveries.as_ref().ok_or(Error::ListenerActive)
    }

    fn accept(&self, delivery: Option<Delivery>) -> Result<Message> {
        match delivery {
            Some(Delivery::Message(message)) => {
                if let Some(ack) = message.ack_request() {
                    self.inner.outbound.post(&ack);
                }
                Ok(message)
            }
            Some(Delivery::Disconnected(reason)) => Err(Error::Disconnected(reason)),
            None => Err(Error::ConnectionClosed),
        }
    }
}
