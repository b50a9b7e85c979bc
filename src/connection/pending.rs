//! Outstanding correlated requests.
//!
//! A waiter is registered under its id before the request is written, so
//! an acknowledgement can never overtake its registration. Each entry is
//! completed at most once: the oneshot sender is moved out of the table
//! when the reply arrives, when the wait times out, or when the event loop
//! stops.

// ============================================================================
// Imports
// ============================================================================

use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{DisconnectReason, Error, Result};
use crate::identifiers::{RequestId, ReturnCode};

// ============================================================================
// Types
// ============================================================================

/// Value delivered to a waiter.
pub(crate) type Completion = std::result::Result<ReturnCode, DisconnectReason>;

/// One registered waiter.
#[derive(Debug)]
struct PendingRequest {
    reply_tx: oneshot::Sender<Completion>,
    registered_at: Instant,
}

// ============================================================================
// PendingTable
// ============================================================================

/// Table of waiters keyed by request id.
#[derive(Debug)]
pub(crate) struct PendingTable {
    entries: Mutex<FxHashMap<RequestId, PendingRequest>>,
    max_pending: usize,
}

impl PendingTable {
    pub(crate) fn new(max_pending: usize) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            max_pending,
        }
    }

    /// Registers a waiter for `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateRequest`] if `id` is already outstanding
    /// - [`Error::TooManyPending`] if the table is full
    pub(crate) fn register(&self, id: RequestId) -> Result<oneshot::Receiver<Completion>> {
        let mut entries = self.entries.lock();

        if entries.contains_key(&id) {
            return Err(Error::duplicate_request(id));
        }
        if entries.len() >= self.max_pending {
            warn!(pending = entries.len(), max = self.max_pending, "Too many pending requests");
            return Err(Error::TooManyPending {
                pending: entries.len(),
                max: self.max_pending,
            });
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        entries.insert(
            id,
            PendingRequest {
                reply_tx,
                registered_at: Instant::now(),
            },
        );
        Ok(reply_rx)
    }

    /// Completes the waiter for `id`. Returns `false` if none was registered.
    pub(crate) fn complete(&self, id: RequestId, rc: ReturnCode) -> bool {
        let Some(pending) = self.entries.lock().remove(&id) else {
            return false;
        };
        debug!(%id, %rc, elapsed_ms = pending.registered_at.elapsed().as_millis() as u64, "Request acknowledged");
        // The waiter may have given up already.
        let _ = pending.reply_tx.send(Ok(rc));
        true
    }

    /// Drops the waiter for `id` without completing it.
    pub(crate) fn remove(&self, id: RequestId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Fails every waiter with `reason`. Returns how many were failed.
    pub(crate) fn fail_all(&self, reason: &DisconnectReason) -> usize {
        let drained: Vec<PendingRequest> = self.entries.lock().drain().map(|(_, p)| p).collect();
        let count = drained.len();

        for pending in drained {
            let _ = pending.reply_tx.send(Err(reason.clone()));
        }
        if count > 0 {
            debug!(count, %reason, "Failed pending requests");
        }
        count
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
