//! Per-client notification queues and their delivery tasks.
//!
//! Each client handle owns one bounded queue drained by one task, however
//! many times it logs in. The kernel only ever `try_send`s into these
//! queues. A client that lets its queue fill is evicted and asked to
//! disconnect, so it never sees a stream with gaps.

use super::SubscriptionChange;
use crate::client::ClientHandle;
use crate::state::{ClientId, Message};
use std::sync::Arc;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reason given to a client evicted for overflowing its queue.
pub const OVERFLOW_REASON: &str = "SendQ exceeded";

/// An event queued for one client.
#[derive(Debug, Clone)]
pub enum Notification {
    Post(Arc<Message>),
    Subscription(Arc<SubscriptionChange>),
}

/// Outcome of offering a notification to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// The queue was at capacity. The subscriber is now evicted.
    Full,
    /// The delivery task has stopped or the subscriber was evicted.
    Closed,
}

/// A client registration: who it is logged in as and where to push.
///
/// Clones share the queue, the delivery task and the eviction flag.
#[derive(Debug, Clone)]
pub struct Subscriber {
    client_id: ClientId,
    username: String,
    tx: mpsc::Sender<Notification>,
    evicted: CancellationToken,
}

impl Subscriber {
    /// Register `handle` as `username` and spawn its delivery task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(handle: ClientHandle, username: &str, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let evicted = CancellationToken::new();
        let client_id = handle.id();
        // Taken here, not in the task, so tasks for one handle run in spawn order.
        let slot = handle.delivery_slot().try_lock_owned().ok();
        tokio::spawn(deliver(handle, slot, rx, evicted.clone()));

        Self {
            client_id,
            username: username.to_string(),
            tx,
            evicted,
        }
    }

    /// The same client, queue and delivery task, registered as `username`.
    pub fn rebind(&self, username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn from_sender(client_id: ClientId, username: &str, tx: mpsc::Sender<Notification>) -> Self {
        Self {
            client_id,
            username: username.to_string(),
            tx,
            evicted: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// False once the delivery task stopped or the client was evicted.
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed() && !self.evicted.is_cancelled()
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    /// Stop delivery and ask the client to disconnect.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    /// Queue a notification without waiting.
    ///
    /// A full queue evicts the subscriber; nothing more is queued for it.
    pub fn offer(&self, notification: Notification) -> Offer {
        if self.evicted.is_cancelled() {
            return Offer::Closed;
        }
        match self.tx.try_send(notification) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => {
                self.evict();
                Offer::Full
            }
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }
}

/// Drain one client's queue, in order, until the queue closes, the client
/// fails or the client is evicted.
async fn deliver(
    handle: ClientHandle,
    slot: Option<OwnedMutexGuard<()>>,
    mut rx: mpsc::Receiver<Notification>,
    evicted: CancellationToken,
) {
    let _slot = match slot {
        Some(guard) => guard,
        None => handle.delivery_slot().lock_owned().await,
    };

    loop {
        let notification = tokio::select! {
            biased;
            _ = evicted.cancelled() => {
                warn!(client = %handle.id(), reason = OVERFLOW_REASON, "Evicting client");
                handle.client().on_disconnect(OVERFLOW_REASON).await;
                return;
            }
            notification = rx.recv() => match notification {
                Some(notification) => notification,
                None => break,
            },
        };

        let result = match &notification {
            Notification::Post(message) => handle.client().on_message(Arc::clone(message)).await,
            Notification::Subscription(change) => {
                handle.client().on_subscription_change(change).await
            }
        };

        if let Err(e) = result {
            warn!(
                client = %handle.id(),
                error = %e,
                "Notification delivery failed; stopping delivery"
            );
            crate::metrics::record_delivery_failure(e.error_code());
            return;
        }
    }

    debug!(client = %handle.id(), "Delivery task finished");
}
