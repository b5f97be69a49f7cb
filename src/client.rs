//! The capability a transport implements to receive pushed events.
//!
//! A WebSocket connection, a test harness or a simulated actor registers a
//! [`ClientHandle`] at login; the kernel's fan-out then pushes the posts and
//! follow-graph changes that concern it.

use crate::error::ClientError;
use crate::kernel::SubscriptionChange;
use crate::state::{ClientId, Message};
use async_trait::async_trait;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Receiver of pushed notifications.
///
/// Calls for one client are made sequentially, in commit order, from that
/// client's own delivery task. There is one such task per handle, however
/// many accounts the handle logs in as. Returning an error stops delivery to
/// this client; the transport should then log the connection out.
#[async_trait]
pub trait Client: Send + Sync {
    /// A post the client is interested in.
    async fn on_message(&self, message: Arc<Message>) -> Result<(), ClientError>;

    /// A follow or unfollow made by the account this client is logged in as.
    async fn on_subscription_change(&self, change: &SubscriptionChange) -> Result<(), ClientError>;

    /// The client fell too far behind and has been deregistered. No further
    /// notifications follow; the transport should close the connection.
    async fn on_disconnect(&self, _reason: &str) {}
}

/// A client plus the identity used to register and deregister it.
///
/// Equality is by handle id, never by username.
#[derive(Clone)]
pub struct ClientHandle {
    id: ClientId,
    client: Arc<dyn Client>,
    /// Held by whichever delivery task is feeding this client.
    delivery: Arc<Mutex<()>>,
}

impl ClientHandle {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self {
            id: ClientId::next(),
            client,
            delivery: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub(crate) fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Held for the lifetime of a delivery task. A task still draining an
    /// old queue keeps it, so a later task for the same handle waits.
    pub(crate) fn delivery_slot(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.delivery)
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientHandle {}

impl Hash for ClientHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle").field("id", &self.id).finish()
    }
}
