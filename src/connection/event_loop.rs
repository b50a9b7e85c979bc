//! Per-connection event loop.
//!
//! One tokio task owns the transport halves and the framer. It handles:
//!
//! - Inbound bytes: reassembled into objects and dispatched by `Action`
//! - Outbound commands from the [`Connection`](crate::Connection) API
//! - Keep-alive `Ping` on an interval, when configured
//!
//! # Dispatch
//!
//! | Action | Handling |
//! |--------|----------|
//! | `Send` | Pushed onto the delivery queue |
//! | `Ack` | Completes the pending request with its `ID` |
//! | `Connected` | Completes the pending `Connect` (id 0) |
//! | `Ping` | Answered with `Pong` |
//! | `Pong` | Ignored |
//! | other | Framing fault, loop stops |
//!
//! # Termination
//!
//! Whatever stops the loop, it fails every pending request with the same
//! [`DisconnectReason`], pushes the disconnect sentinel onto the delivery
//! queue and publishes [`ConnectionState::Closed`].

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, trace, warn};

use crate::error::{DisconnectReason, Error, Result};
use crate::identifiers::{RequestId, ReturnCode};
use crate::protocol::{Action, Message, Request};
use crate::transport::{FrameReader, FrameWriter};

use super::core::Shared;
use super::delivery::{Delivery, DeliverySender};
use super::framer::{Frame, Framer};
use super::state::ConnectionState;

// ============================================================================
// Command
// ============================================================================

/// Internal commands for the event loop.
#[derive(Debug)]
pub(crate) enum Command {
    /// Write one serialized object.
    Write {
        frame: String,
        written_tx: Option<oneshot::Sender<Result<()>>>,
    },
    /// Close the transport and stop.
    Shutdown,
}

// ============================================================================
// Outbound
// ============================================================================

/// Handle for queueing writes on the event loop.
#[derive(Debug, Clone)]
pub(crate) struct Outbound {
    tx: mpsc::UnboundedSender<Command>,
}

impl Outbound {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Writes `request` and waits until the transport accepted it.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has stopped
    /// - the transport's error if the write failed
    pub(crate) async fn write(&self, request: &Request) -> Result<()> {
        let frame = request.to_json()?;
        let (written_tx, written_rx) = oneshot::channel();

        self.tx
            .send(Command::Write {
                frame,
                written_tx: Some(written_tx),
            })
            .map_err(|_| Error::ConnectionClosed)?;

        written_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Queues `request` without waiting for the write.
    pub(crate) fn post(&self, request: &Request) {
        let frame = match request.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, action = request.action(), "Failed to serialize request");
                return;
            }
        };
        if self
            .tx
            .send(Command::Write {
                frame,
                written_tx: None,
            })
            .is_err()
        {
            debug!(action = request.action(), "Event loop stopped, request dropped");
        }
    }

    /// Asks the event loop to close the transport.
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Returns a handle that does not keep the event loop running.
    pub(crate) fn downgrade(&self) -> WeakOutbound {
        WeakOutbound {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning [`Outbound`].
///
/// The command channel closes once every [`Outbound`] is gone, even while
/// weak handles remain.
#[derive(Debug, Clone)]
pub(crate) struct WeakOutbound {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl WeakOutbound {
    /// Returns an [`Outbound`] if a connection handle still exists.
    pub(crate) fn upgrade(&self) -> Option<Outbound> {
        self.tx.upgrade().map(|tx| Outbound { tx })
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// State owned by the event loop task.
pub(crate) struct EventLoop<R, W> {
    reader: R,
    writer: W,
    commands: mpsc::UnboundedReceiver<Command>,
    framer: Framer,
    shared: Arc<Shared>,
    deliveries: DeliverySender,
    keepalive: Option<Interval>,
}

impl<R, W> EventLoop<R, W>
where
    R: FrameReader,
    W: FrameWriter,
{
    pub(crate) fn new(
        reader: R,
        writer: W,
        commands: mpsc::UnboundedReceiver<Command>,
        shared: Arc<Shared>,
        deliveries: DeliverySender,
        keepalive: Option<Duration>,
    ) -> Self {
        let keepalive = keepalive.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        Self {
            reader,
            writer,
            commands,
            framer: Framer::new(),
            shared,
            deliveries,
            keepalive,
        }
    }

    /// Runs until the transport ends, a fault occurs or shutdown is requested.
    pub(crate) async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                // Incoming bytes from the server
                read = self.reader.read_frame() => {
                    match read {
                        Ok(Some(bytes)) => {
                            trace!(bytes = bytes.len(), "Received");
                            self.framer.extend(&bytes);
                            if let Err(reason) = self.drain_frames().await {
                                break reason;
                            }
                        }

                        Ok(None) => {
                            if self.shared.state.get().is_terminal() {
                                debug!("Transport closed");
                                break DisconnectReason::Status(0);
                            }
                            debug!(buffered = self.framer.buffered(), "Transport closed by remote");
                            break DisconnectReason::Transport("connection closed by remote".into());
                        }

                        Err(e) => {
                            error!(error = %e, "Transport read failed");
                            break DisconnectReason::Transport(e.to_string());
                        }
                    }
                }

                // Commands from the Connection API
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Write { frame, written_tx }) => {
                            trace!(frame = %frame, "Sending");
                            let result = self.writer.write_frame(&frame).await;
                            let failure = result.as_ref().err().map(ToString::to_string);
                            if let Some(tx) = written_tx {
                                let _ = tx.send(result);
                            }
                            if let Some(cause) = failure {
                                error!(error = %cause, "Transport write failed");
                                break DisconnectReason::Transport(cause);
                            }
                        }

                        Some(Command::Shutdown) => {
                            debug!("Shutdown command received");
                            if let Err(e) = self.writer.close().await {
                                debug!(error = %e, "Transport close failed");
                            }
                            break DisconnectReason::Status(0);
                        }

                        None => {
                            debug!("All connection handles dropped");
                            let _ = self.writer.close().await;
                            break DisconnectReason::Status(0);
                        }
                    }
                }

                // Keep-alive
                () = tick(self.keepalive.as_mut()) => {
                    trace!("Keep-alive ping");
                    if let Err(reason) = self.send(&Request::Ping).await {
                        break reason;
                    }
                }
            }
        };

        self.finish(reason);
    }

    /// Dispatches every complete object in the framer.
    async fn drain_frames(&mut self) -> std::result::Result<(), DisconnectReason> {
        loop {
            match self.framer.next_frame() {
                Frame::Object => self.dispatch().await?,
                Frame::NeedMore => return Ok(()),
                Frame::Invalid { line } => {
                    warn!(line, "Invalid JSON received, closing connection");
                    return Err(DisconnectReason::Framing(format!(
                        "invalid JSON at line {line}"
                    )));
                }
            }
        }
    }

    /// Handles the object currently held by the framer.
    async fn dispatch(&mut self) -> std::result::Result<(), DisconnectReason> {
        let parser = self.framer.parser();
        let name = parser.find_string("Action");

        match name.and_then(Action::parse) {
            Some(Action::Send) => {
                let Some(message) = Message::from_parsed(parser) else {
                    warn!("Send without Topic or Queue, closing connection");
                    return Err(DisconnectReason::Framing(
                        "Send without Topic or Queue".into(),
                    ));
                };
                trace!(destination = %message.destination(), id = %message.id(), "Message received");
                if self.deliveries.send(Delivery::Message(message)).is_err() {
                    debug!("Delivery queue dropped, message discarded");
                }
            }

            Some(Action::Ack) => {
                let id = parser.get_u32("ID").map(RequestId::new);
                let rc = ReturnCode::new(parser.get_int("RC", 0));
                match id.filter(|id| id.is_correlated()) {
                    Some(id) => {
                        if !self.shared.pending.complete(id, rc) {
                            debug!(%id, %rc, "Ack for unknown request");
                        }
                    }
                    None => trace!(?id, "Ack without request id"),
                }
            }

            Some(Action::Connected) => {
                let rc = ReturnCode::new(parser.get_int("RC", 0));
                if !self.shared.pending.complete(RequestId::CONNECT, rc) {
                    debug!(%rc, "Unsolicited Connected");
                }
            }

            Some(Action::Ping) => self.send(&Request::Pong).await?,

            Some(Action::Pong) => trace!("Pong received"),

            None => {
                let action = name.unwrap_or_default().to_owned();
                warn!(%action, "Unknown action, closing connection");
                return Err(DisconnectReason::Framing(format!("unknown action {action:?}")));
            }
        }
        Ok(())
    }

    /// Writes a request generated by the loop itself.
    async fn send(&mut self, request: &Request) -> std::result::Result<(), DisconnectReason> {
        let frame = request
            .to_json()
            .map_err(|e| DisconnectReason::Transport(e.to_string()))?;
        self.writer.write_frame(&frame).await.map_err(|e| {
            error!(error = %e, action = request.action(), "Transport write failed");
            DisconnectReason::Transport(e.to_string())
        })
    }

    /// Fails waiters, pushes the sentinel and publishes `Closed`.
    fn finish(self, reason: DisconnectReason) {
        self.shared.state.transition(ConnectionState::Closing);

        let failed = self.shared.pending.fail_all(&reason);
        let _ = self.deliveries.send(Delivery::Disconnected(reason.clone()));
        drop(self.deliveries);

        self.shared.state.finish();

        if reason.is_failure() {
            warn!(%reason, failed, "Event loop terminated");
        } else {
            debug!(%reason, failed, "Event loop terminated");
        }
    }
}

/// Waits for the next keep-alive tick, forever if keep-alive is off.
async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}
