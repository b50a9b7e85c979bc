//! Inbound message delivery.
//!
//! The event loop pushes every inbound message onto an unbounded FIFO.
//! When the loop stops it pushes one [`Delivery::Disconnected`] sentinel
//! and drops its sender, so a consumer blocked on the queue always wakes:
//! the first one sees the sentinel, any later one sees the queue closed.
//!
//! The queue is drained either by [`Connection::receive`] or, when a
//! [`MessageHandler`] is installed, by a listener task that invokes the
//! handler and then acknowledges QoS>0 messages.
//!
//! [`Connection::receive`]: crate::Connection::receive

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tracing::{debug, trace};

use crate::error::DisconnectReason;
use crate::protocol::Message;

use super::event_loop::WeakOutbound;

// ============================================================================
// Types
// ============================================================================

/// Message listener callback.
///
/// Called on the listener task for each inbound message, in arrival order.
pub type MessageHandler = Box<dyn Fn(Message) + Send + Sync>;

/// Sending side of the delivery queue, owned by the event loop.
pub(crate) type DeliverySender = mpsc::UnboundedSender<Delivery>;

/// One item on the delivery queue.
#[derive(Debug)]
pub(crate) enum Delivery {
    /// An application message.
    Message(Message),
    /// The event loop has stopped.
    Disconnected(DisconnectReason),
}

// ============================================================================
// DeliveryQueue
// ============================================================================

/// Receiving side of the delivery queue. Safe to share between consumers.
#[derive(Debug)]
pub(crate) struct DeliveryQueue {
    rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
}

/// Creates a connected sender and queue.
pub(crate) fn channel() -> (DeliverySender, DeliveryQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, DeliveryQueue { rx: Mutex::new(rx) })
}

impl DeliveryQueue {
    /// Waits for the next delivery. `None` once the queue is closed and empty.
    pub(crate) async fn next(&self) -> Option<Delivery> {
        self.rx.lock().await.recv().await
    }

    /// Waits for the next delivery, at most `timeout`.
    pub(crate) async fn next_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Delivery>, Elapsed> {
        tokio::time::timeout(timeout, self.next()).await
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Spawns the task that feeds `handler` from `queue`.
///
/// The handler runs before the acknowledgement is sent. The task ends at
/// the disconnect sentinel. It holds only a weak handle to the event loop,
/// so dropping every [`Connection`](crate::Connection) still ends the
/// session.
pub(crate) fn spawn_listener(
    queue: DeliveryQueue,
    handler: MessageHandler,
    outbound: WeakOutbound,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(delivery) = queue.next().await {
            match delivery {
                Delivery::Message(message) => {
                    let id = message.id();
                    let ack = message.ack_request();
                    trace!(destination = %message.destination(), "Dispatching to listener");
                    handler(message);
                    if let Some(ack) = ack {
                        match outbound.upgrade() {
                            Some(outbound) => outbound.post(&ack),
                            None => debug!(%id, "Connection dropped, ack discarded"),
                        }
                    }
                }
                Delivery::Disconnected(reason) => {
                    debug!(%reason, "Listener stopped");
                    return;
                }
            }
        }
        debug!("Listener stopped, queue closed");
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::connection::event_loop::{Command, Outbound};
    use crate::identifiers::RequestId;

    #[tokio::test]
    async fn test_queue_is_fifo_then_closed() {
        let (tx, queue) = channel();
        tx.send(Delivery::Message(Message::topic("a", "1"))).unwrap();
        tx.send(Delivery::Disconnected(DisconnectReason::Status(0)))
            .unwrap();
        drop(tx);

        assert!(matches!(queue.next().await, Some(Delivery::Message(m)) if m.destination().name() == "a"));
        assert!(matches!(
            queue.next().await,
            Some(Delivery::Disconnected(DisconnectReason::Status(0)))
        ));
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_timeout_elapses() {
        let (_tx, queue) = channel();
        assert!(queue.next_timeout(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_listener_acks_after_handler() {
        let (tx, queue) = channel();
        let (outbound, mut commands) = Outbound::channel();
        let seen = Arc::new(SyncMutex::new(Vec::new()));

        let handler_seen = Arc::clone(&seen);
        let handle = spawn_listener(
            queue,
            Box::new(move |message: Message| handler_seen.lock().push(message.id())),
            outbound.downgrade(),
        );

        let mut parser = crate::json::JsonParser::new();
        assert!(parser.parse(br#"{"Action":"Send","Topic":"t","QoS":1,"ID":3}"#).is_complete());
        tx.send(Delivery::Message(Message::from_parsed(&parser).unwrap()))
            .unwrap();
        tx.send(Delivery::Message(Message::topic("t", "qos0"))).unwrap();
        tx.send(Delivery::Disconnected(DisconnectReason::Status(0)))
            .unwrap();

        handle.await.unwrap();
        assert_eq!(*seen.lock(), vec![RequestId::new(3), RequestId::CONNECT]);

        match commands.try_recv().unwrap() {
            Command::Write { frame, .. } => assert_eq!(frame, r#"{"Action":"Ack","ID":3,"RC":0}"#),
            Command::Shutdown => panic!("unexpected shutdown"),
        }
        assert!(commands.try_recv().is_err());
        drop(outbound);
    }

    #[tokio::test]
    async fn test_listener_does_not_hold_connection_open() {
        let (tx, queue) = channel();
        let (outbound, mut commands) = Outbound::channel();
        let _handle = spawn_listener(queue, Box::new(|_| {}), outbound.downgrade());

        drop(outbound);
        assert!(commands.recv().await.is_none());
        drop(tx);
    }
}
